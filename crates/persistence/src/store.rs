//! Key/value storage backends.

use crate::StoreError;
use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Asynchronous string store keyed by name.
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send;
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// In-process store. Clones share the same entries, which lets tests model
/// two processes writing one document.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` and `remove` fail until cleared.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(key.to_string()));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        let result = self
            .entries
            .lock()
            .map(|m| m.get(key).cloned())
            .map_err(|_| StoreError::Poisoned);
        async move { result }
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send {
        let result = self.check_writable(key).and_then(|()| {
            let mut m = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
            m.insert(key.to_string(), value);
            Ok(())
        });
        async move { result }
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send {
        let result = self.check_writable(key).and_then(|()| {
            let mut m = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
            m.remove(key);
            Ok(())
        });
        async move { result }
    }
}

/// One file per key under a directory. Writes go through a temporary file
/// and a rename so readers never see a torn document.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn io_err(key: &str, source: std::io::Error) -> StoreError {
    StoreError::Io {
        key: key.to_string(),
        source,
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        let path = self.path_for(key);
        let key = key.to_string();
        async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => Ok(Some(text)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(io_err(&key, e)),
            }
        }
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send {
        let path = self.path_for(key);
        let dir = self.dir.clone();
        let key = key.to_string();
        async move {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| io_err(&key, e))?;
            let tmp = path.with_extension(format!("json.tmp-{}", std::process::id()));
            tokio::fs::write(&tmp, value.as_bytes())
                .await
                .map_err(|e| io_err(&key, e))?;
            tokio::fs::rename(&tmp, &path)
                .await
                .map_err(|e| io_err(&key, e))
        }
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send {
        let path = self.path_for(key);
        let key = key.to_string();
        async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_err(&key, e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("idle-store-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn memory_clones_share_entries() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set("k", "v".into()).await.unwrap();
        assert_eq!(b.get("k").await.unwrap().as_deref(), Some("v"));
        b.remove("k").await.unwrap();
        assert_eq!(a.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_write_failures_surface() {
        let s = MemoryStore::new();
        s.set_fail_writes(true);
        assert!(matches!(
            s.set("k", "v".into()).await,
            Err(StoreError::Unavailable(_))
        ));
        s.set_fail_writes(false);
        s.set("k", "v".into()).await.unwrap();
    }

    #[tokio::test]
    async fn file_store_roundtrip_and_missing_keys() {
        let dir = scratch_dir("roundtrip");
        let s = FileStore::new(&dir);
        assert_eq!(s.get("idle-clicker:state").await.unwrap(), None);
        s.set("idle-clicker:state", "{\"a\":1}".into()).await.unwrap();
        assert_eq!(
            s.get("idle-clicker:state").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(dir.join("idle-clicker_state.json").exists());
        s.remove("idle-clicker:state").await.unwrap();
        s.remove("idle-clicker:state").await.unwrap();
        assert_eq!(s.get("idle-clicker:state").await.unwrap(), None);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
