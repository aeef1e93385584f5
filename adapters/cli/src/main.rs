#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives a Merge Forge session from standard input.

mod input;
mod render;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use merge_forge_core::{GameConfig, Variant};
use merge_forge_session::{
    ActOutcome, ClaimOutcome, Notification, Session, SessionId, SessionStore, SpawnOutcome,
};
use merge_forge_storage::JsonFileStore;
use merge_forge_system_spawning::{Config, Spawning};

use crate::input::{Input, HELP};

#[derive(Debug, Parser)]
#[command(name = "merge-forge")]
#[command(about = "Merge matching pieces into ever rarer ones")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play an interactive session, one command per line.
    Play {
        /// TOML file with game configuration overrides.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Seed for the spawn random source.
        #[arg(long)]
        seed: Option<u64>,
        /// Board variant, overriding the configuration file.
        #[arg(long, value_enum)]
        variant: Option<BoardKind>,
        /// Directory holding saved sessions.
        #[arg(long)]
        store: Option<PathBuf>,
        /// Identifier of the saved session to resume or create.
        #[arg(long, default_value = "default")]
        session: String,
    },
    /// Print the best saved sessions.
    Leaderboard {
        /// Directory holding saved sessions.
        #[arg(long)]
        store: PathBuf,
        /// Number of entries to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BoardKind {
    Grid,
    Floating,
}

impl From<BoardKind> for Variant {
    fn from(kind: BoardKind) -> Self {
        match kind {
            BoardKind::Grid => Variant::Grid,
            BoardKind::Floating => Variant::Floating,
        }
    }
}

/// Entry point for the Merge Forge command-line interface.
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config,
            seed,
            variant,
            store,
            session,
        } => {
            let mut game = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                game.seed = seed;
            }
            if let Some(variant) = variant {
                game.variant = variant.into();
            }
            play(game, store, SessionId::new(session))
        }
        Commands::Leaderboard { store, limit } => leaderboard(&store, limit),
    }
}

fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse config {}", path.display()))
}

fn play(config: GameConfig, store: Option<PathBuf>, id: SessionId) -> Result<()> {
    let spawning = Spawning::new(Config::new(config.seed));
    let mut session = Session::new(config, spawning).context("failed to start session")?;

    if let Some(directory) = store {
        let store = JsonFileStore::open(&directory)
            .with_context(|| format!("failed to open store {}", directory.display()))?;
        if session.resume(Box::new(store), id.clone())? {
            println!("resumed session {id}");
        } else {
            info!("starting new session {id}");
        }
        for notification in session.drain_notifications() {
            if matches!(notification, Notification::LoadFailed { .. }) {
                println!("{}", describe(&notification));
            }
        }
    }

    print!("{}", render::board(&session));
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read standard input")?;
        let command = match Input::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(error) => {
                println!("{error:#}");
                continue;
            }
        };
        debug!("input {command:?}");
        if command == Input::Quit {
            break;
        }
        if let Err(error) = run(&mut session, command) {
            println!("error: {error:#}");
        }
        for notification in session.drain_notifications() {
            println!("{}", describe(&notification));
        }
        io::stdout().flush().context("failed to flush output")?;
    }

    session.shutdown().context("failed to close session")?;
    Ok(())
}

fn run(session: &mut Session, command: Input) -> Result<()> {
    match command {
        Input::Click(cell) => report(session.select_or_act(cell)?),
        Input::Drag { entity, to } => {
            session.drag_start(entity)?;
            if let Some(partner) = session.drag_update(to)? {
                println!("would merge with #{}", partner.get());
            }
            report(session.drag_end()?);
        }
        Input::Spawn => match session.spawn()? {
            SpawnOutcome::Spawned {
                entity,
                tier,
                position,
            } => println!(
                "spawned #{} tier {} at {position:?}",
                entity.get(),
                tier.rank()
            ),
            SpawnOutcome::Rejected(reason) => println!("cannot spawn: {reason:?}"),
        },
        Input::Undo => {
            if !session.undo()? {
                println!("nothing to undo");
            }
        }
        Input::Reset => session.reset()?,
        Input::Claim(mission) => match session.claim_mission(mission)? {
            ClaimOutcome::Claimed(reward) => println!(
                "claimed {mission}: {} points, {} xp",
                reward.points, reward.experience
            ),
            ClaimOutcome::Rejected(reason) => println!("cannot claim {mission}: {reason}"),
        },
        Input::Tick(millis) => session.tick(Duration::from_millis(millis))?,
        Input::Board => print!("{}", render::board(session)),
        Input::Missions => print!("{}", render::missions(session.missions())),
        Input::Save => {
            session.save_now()?;
            println!("saved");
        }
        Input::Help => println!("{HELP}"),
        Input::Quit => {}
    }
    Ok(())
}

fn report(outcome: ActOutcome) {
    match outcome {
        ActOutcome::Selected(id) => println!("selected #{}", id.get()),
        ActOutcome::Deselected => println!("deselected"),
        ActOutcome::Ignored => {}
        ActOutcome::Moved { entity, to } => println!("moved #{} to {to:?}", entity.get()),
        ActOutcome::Merged {
            result,
            tier,
            score_gained,
        } => println!(
            "merged into #{} tier {} (+{score_gained})",
            result.get(),
            tier.rank()
        ),
        ActOutcome::Rejected(reason) => println!("rejected: {reason:?}"),
    }
}

fn describe(notification: &Notification) -> String {
    match notification {
        Notification::ScoreChanged { score } => format!("score {score}"),
        Notification::MissionCompleted { mission } => format!("{mission} completed"),
        Notification::GameOver { score } => format!("game over, final score {score}"),
        Notification::SaveFailed { reason } => format!("save failed: {reason}"),
        Notification::LoadFailed { reason } => format!("load failed, starting fresh: {reason}"),
    }
}

fn leaderboard(directory: &Path, limit: usize) -> Result<()> {
    let mut store = JsonFileStore::open(directory)
        .with_context(|| format!("failed to open store {}", directory.display()))?;
    let entries = store.leaderboard(limit)?;
    if entries.is_empty() {
        println!("no saved sessions");
    }
    for (place, entry) in entries.iter().enumerate() {
        println!(
            "{:>2}. {:<20} {:>8}  tier {}",
            place + 1,
            entry.session,
            entry.score,
            entry.highest_tier.rank()
        );
    }
    store.close()?;
    Ok(())
}
