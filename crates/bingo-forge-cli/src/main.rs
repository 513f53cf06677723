//! Bingo-Forge CLI - generate, preview and share challenge boards.
//!
//! `bforge generate` builds a board from a YAML content configuration and
//! prints it as a text grid together with the seed that reproduces it; the
//! remaining subcommands talk to a remote board store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::Level;

use bingo_forge_client::BoardStoreClient;
use bingo_forge_core::Board;
use bingo_forge_engine::{BoardGenerator, ContentConfig};

mod render;

/// Bingo-Forge: procedural challenge boards for community games.
///
/// Boards are reproducible: `generate` prints the seed it drew, and the
/// same configuration with the same seed always yields the same board.
#[derive(Parser, Debug)]
#[command(
    name = "bforge",
    author,
    version,
    about = "Bingo-Forge: generate and share challenge boards",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a board from a YAML content configuration.
    ///
    /// With `--difficulty` or `--level` the generator runs its refinement
    /// loop toward that target; with neither, the board is filled once by
    /// template weights alone.
    Generate {
        /// Path to the content configuration.
        config: PathBuf,

        /// Board width in tiles.
        #[arg(short = 'W', long, default_value_t = 5)]
        width: usize,

        /// Board height in tiles.
        #[arg(short = 'H', long, default_value_t = 5)]
        height: usize,

        /// Target mean tile difficulty.
        #[arg(short, long, conflicts_with = "level")]
        difficulty: Option<f64>,

        /// Difficulty level from the catalog, by name or 1-based index.
        #[arg(short, long)]
        level: Option<String>,

        /// Override the number of refinement iterations.
        #[arg(short, long)]
        attempts: Option<usize>,

        /// Seed for reproducible generation; drawn at random when omitted.
        #[arg(short, long)]
        seed: Option<u64>,

        /// Write the board interchange JSON to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a generated board to a board store.
    Upload {
        /// Board interchange JSON written by `generate --output`.
        board: PathBuf,

        /// Base URL of the board store.
        #[arg(long, env = "BFORGE_STORE_URL")]
        store: String,

        /// Allow several players to claim the same tile.
        #[arg(long)]
        allow_multiple_claims: bool,
    },

    /// List the boards a store knows about.
    Boards {
        /// Base URL of the board store.
        #[arg(long, env = "BFORGE_STORE_URL")]
        store: String,
    },

    /// Claim one tile of a stored board.
    Claim {
        /// Store-assigned board identifier.
        board_id: i64,

        /// Tile column, zero-based.
        x: usize,

        /// Tile row, zero-based.
        y: usize,

        /// Single-character claimer tag.
        claim: char,

        /// Base URL of the board store.
        #[arg(long, env = "BFORGE_STORE_URL")]
        store: String,
    },

    /// Delete a stored board.
    Delete {
        /// Store-assigned board identifier.
        board_id: i64,

        /// Base URL of the board store.
        #[arg(long, env = "BFORGE_STORE_URL")]
        store: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Generate {
            config,
            width,
            height,
            difficulty,
            level,
            attempts,
            seed,
            output,
        } => {
            generate(
                &config, width, height, difficulty, level, attempts, seed, output,
            )?;
        }

        Commands::Upload {
            board,
            store,
            allow_multiple_claims,
        } => {
            let board = read_board(&board)?;
            let response = BoardStoreClient::new(store)
                .upload(&board, allow_multiple_claims)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Boards { store } => {
            let response = BoardStoreClient::new(store).boards().await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Claim {
            board_id,
            x,
            y,
            claim,
            store,
        } => {
            let response = BoardStoreClient::new(store)
                .claim_tile(board_id, x, y, claim)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Delete { board_id, store } => {
            let response = BoardStoreClient::new(store).delete(board_id).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn generate(
    config_path: &Path,
    width: usize,
    height: usize,
    difficulty: Option<f64>,
    level: Option<String>,
    attempts: Option<usize>,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = ContentConfig::load(config_path).with_context(|| {
        format!(
            "failed to load configuration from {}",
            config_path.display()
        )
    })?;

    let mut generator = BoardGenerator::new(&config).with_size(width, height);
    generator = match (difficulty, level) {
        (Some(target), _) => generator.with_target_difficulty(target),
        // A level argument may be a catalog name or a 1-based index.
        (None, Some(level)) => match level.parse::<usize>() {
            Ok(index) => generator.with_difficulty_level(index),
            Err(_) => generator.with_difficulty_level_name(&level),
        },
        (None, None) => generator.unconstrained(),
    };
    if let Some(attempts) = attempts {
        generator = generator.with_max_attempts(attempts);
    }

    let seed = seed.unwrap_or_else(|| rand::rng().random());
    tracing::debug!(seed, width, height, "generating board");
    let board = generator.generate_seeded(seed);

    println!("{}", render::grid(&board));
    println!("🎲 Seed:       {seed}");
    println!("📏 Size:       {}x{}", board.width, board.height);
    println!("🎯 Difficulty: {:.3}", board.difficulty);
    let tagged: Vec<String> = board
        .category_counts
        .iter()
        .filter(|(_, &count)| count > 0)
        .map(|(name, count)| format!("{name} x{count}"))
        .collect();
    if !tagged.is_empty() {
        println!("🏷️  Categories: {}", tagged.join(", "));
    }

    if let Some(path) = output {
        fs::write(&path, serde_json::to_string_pretty(&board)?)
            .with_context(|| format!("failed to write board to {}", path.display()))?;
        println!("💾 Board:      {}", path.display());
    }

    Ok(())
}

/// Parse a board interchange file back into a [`Board`].
fn read_board(path: &Path) -> Result<Board> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read board from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a board interchange file", path.display()))
}
