#![deny(warnings)]

use idle_core::{Clock, SystemClock};
use persistence::{load_document, FileStore, LoadSource};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./saves".to_string());
    std::fs::create_dir_all(&dir)?;
    let store = FileStore::new(&dir);
    // Loading performs the legacy-key move as a side effect.
    let out = load_document(&store, SystemClock.now_ms()).await?;
    match out.source {
        LoadSource::Migrated { from } => println!("Migrated save from {from} in {dir}"),
        LoadSource::Current => println!("Save in {dir} is already current"),
        LoadSource::Fresh => println!("No save found in {dir}"),
        LoadSource::Corrupted => println!("Save in {dir} was unreadable and has been removed"),
    }
    Ok(())
}
