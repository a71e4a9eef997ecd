#![deny(warnings)]

//! Headless driver: load a save, run one-shot commands, then optionally tick
//! in the foreground or background for a while.

use anyhow::{bail, Context, Result};
use idle_core::{GameConfig, SystemClock};
use idle_runtime::{run, Game, Mode, Notification, NotificationKind};
use persistence::FileStore;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum Command {
    Click(u32),
    Buy(String),
    BuyMax(String),
    BuyPrestige(String),
    Prestige,
    Reset,
    ToggleLucky,
}

#[derive(Debug)]
struct Args {
    store: PathBuf,
    config: Option<PathBuf>,
    background: bool,
    seconds: Option<u64>,
    commands: Vec<Command>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        store: PathBuf::from("./saves"),
        config: None,
        background: false,
        seconds: None,
        commands: Vec::new(),
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| it.next().with_context(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--store" => args.store = PathBuf::from(value("--store")?),
            "--config" => args.config = Some(PathBuf::from(value("--config")?)),
            "--mode" => match value("--mode")?.as_str() {
                "foreground" => args.background = false,
                "background" => args.background = true,
                other => bail!("unknown mode {other:?}, expected foreground or background"),
            },
            "--seconds" => args.seconds = Some(value("--seconds")?.parse()?),
            "--click" => args.commands.push(Command::Click(value("--click")?.parse()?)),
            "--buy" => args.commands.push(Command::Buy(value("--buy")?)),
            "--buy-max" => args.commands.push(Command::BuyMax(value("--buy-max")?)),
            "--buy-prestige" => args
                .commands
                .push(Command::BuyPrestige(value("--buy-prestige")?)),
            "--prestige" => args.commands.push(Command::Prestige),
            "--reset" => args.commands.push(Command::Reset),
            "--toggle-lucky" => args.commands.push(Command::ToggleLucky),
            other => bail!("unrecognized argument {other:?}"),
        }
    }
    Ok(args)
}

fn load_config(path: Option<&PathBuf>) -> Result<GameConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_yaml::from_str::<GameConfig>(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => GameConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn print_notes(notes: &[Notification]) {
    for n in notes {
        let tag = match n.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Failure => "!!",
            NotificationKind::Info => "--",
        };
        if n.message.is_empty() {
            println!("[{tag}] {}", n.title);
        } else {
            println!("[{tag}] {}: {}", n.title, n.message);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;
    let config = load_config(args.config.as_ref())?;
    info!(store = %args.store.display(), background = args.background, "starting CLI");

    let store = FileStore::new(&args.store);
    let mut game = Game::load(store, SystemClock, config).await;
    let report = game.load_report().clone();
    if report.offline_earnings > 0.0 {
        println!("Offline earnings: {:.2}", report.offline_earnings);
    }

    for cmd in &args.commands {
        let notes = match cmd {
            Command::Click(n) => {
                let mut notes = Vec::new();
                let mut earned = 0.0;
                for _ in 0..*n {
                    let out = game.click(1.0).await;
                    earned += out.value;
                    notes.extend(out.notifications);
                }
                println!("Clicked {n} times for {earned:.2}");
                notes
            }
            Command::Buy(id) => game.purchase_upgrade(id).await.notifications,
            Command::BuyMax(id) => game.purchase_upgrade_max(id).await.notifications,
            Command::BuyPrestige(id) => game.purchase_prestige_upgrade(id).await.notifications,
            Command::Prestige => game.prestige().await.notifications,
            Command::Reset => game.reset().await.notifications,
            Command::ToggleLucky => game.toggle_lucky_toasts().await.notifications,
        };
        print_notes(&notes);
    }

    if let Some(seconds) = args.seconds {
        let mode = if args.background {
            Mode::Background {
                holder: format!("cli-{}", std::process::id()),
            }
        } else {
            Mode::Foreground
        };
        let stop = async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
        };
        let summary = run(&mut game, mode, stop).await;
        println!(
            "Ran {} ticks | accrued: {:.2} | adopted: {}",
            summary.ticks, summary.accrued, summary.adoptions
        );
    }

    let s = game.state();
    println!(
        "Status | currency: {:.2} | click: {:.2} | idle: {:.2}/s | prestige: L{} ({} pts, +{} available) | achievements: {}",
        s.currency,
        s.click_value,
        s.idle_rate,
        s.prestige.level,
        s.prestige.prestige_points,
        game.prestige_preview(),
        s.achievements.values().filter(|a| a.unlocked).count()
    );
    Ok(())
}
