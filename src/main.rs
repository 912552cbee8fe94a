use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use fruit_run::game::{GameMode, LevelCatalog, TOTAL_LEVELS};
use fruit_run::metrics::game_metrics::format_ms;
use fruit_run::modes::PlayMode;
use fruit_run::persistence::{Board, JsonFileStore, LeaderboardEntry, Persistence};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fruit_run")]
#[command(version, about = "Reverse snake: you are the fruit, the snake hunts you")]
struct Cli {
    /// What to do
    #[arg(long, default_value = "story")]
    mode: Mode,

    /// Level to play; story mode defaults to the player's current level
    #[arg(long)]
    level: Option<u32>,

    /// Player name used for progress and leaderboards
    #[arg(long, default_value = "player")]
    player: String,

    /// JSON file holding progress and leaderboards
    #[arg(long, default_value = "fruit_run_store.json")]
    store: PathBuf,

    /// JSON level catalog replacing the built-in campaign
    #[arg(long)]
    levels: Option<PathBuf>,

    /// Log file; the terminal belongs to the game while it runs
    #[arg(long, default_value = "fruit_run.log")]
    log_file: PathBuf,

    /// Rows to show in leaderboard mode
    #[arg(long, default_value = "10")]
    limit: usize,
}

#[derive(Clone, ValueEnum)]
enum Mode {
    /// Play the campaign, three lives a day
    Story,
    /// Play any unlocked level for as long as you last
    Survival,
    /// Print leaderboards and personal bests
    Leaderboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    let catalog = match &cli.levels {
        Some(path) => LevelCatalog::load(path)
            .with_context(|| format!("Failed to load levels from {}", path.display()))?,
        None => LevelCatalog::builtin(),
    };
    let mut store = JsonFileStore::open(&cli.store, cli.player.as_str())
        .with_context(|| format!("Failed to open store {}", cli.store.display()))?;

    // Dispatch to appropriate mode
    match cli.mode {
        Mode::Story => {
            let level = match cli.level {
                Some(level) => level,
                None => {
                    let progress = store.story_progress()?;
                    if progress.is_completed {
                        bail!("Campaign already complete; pick a level with --level");
                    }
                    progress.current_level
                }
            };
            info!(level, player = %cli.player, "starting story");
            PlayMode::new(catalog, store, level, GameMode::Story)
                .run()
                .await?;
        }
        Mode::Survival => {
            let level = cli.level.unwrap_or(1);
            info!(level, player = %cli.player, "starting survival");
            PlayMode::new(catalog, store, level, GameMode::Survival)
                .run()
                .await?;
        }
        Mode::Leaderboard => print_leaderboards(&mut store, cli.level, cli.limit)?,
    }

    Ok(())
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn print_leaderboards(store: &mut JsonFileStore, level: Option<u32>, limit: usize) -> Result<()> {
    let progress = store.story_progress()?;

    match level {
        Some(level) => {
            println!("Survival leaderboard, level {level}");
            let board = Board::Survival(level);
            print_run_rows(&store.leaderboard(board, limit)?);
            match store.rank(board)? {
                Some(rank) => println!(
                    "Your best: {} (#{rank})",
                    format_ms(store.personal_best(level)?)
                ),
                None => println!("No run on this level yet"),
            }
        }
        None => {
            println!("Story leaderboard");
            for (i, entry) in store.leaderboard(Board::Story, limit)?.iter().enumerate() {
                println!("  {:>3}. {:<20} level {}", i + 1, entry.username, entry.score);
            }

            let reached = if progress.is_completed {
                "campaign complete".to_string()
            } else {
                format!("level {} of {TOTAL_LEVELS}", progress.current_level)
            };
            println!();
            println!(
                "You: {reached}, {} lives left today",
                progress.tries_remaining
            );

            let bests = store.all_personal_bests(progress.current_level)?;
            if !bests.is_empty() {
                println!("Survival personal bests:");
                for (level, best) in bests {
                    println!("  level {level:>2}: {}", format_ms(best));
                }
            }

            println!();
            println!("Survival leaderboard, all levels");
            print_run_rows(&store.leaderboard(Board::Global, limit)?);
            match store.rank(Board::Global)? {
                Some(rank) => println!(
                    "Your best: {} (#{rank})",
                    format_ms(store.global_personal_best()?)
                ),
                None => println!("No survival run yet"),
            }
        }
    }

    Ok(())
}

fn print_run_rows(entries: &[LeaderboardEntry]) {
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "  {:>3}. {:<20} {}  length {:>3}  food {:>3}",
            i + 1,
            entry.username,
            format_ms(entry.score),
            entry.snake_length,
            entry.foods_eaten
        );
    }
}
