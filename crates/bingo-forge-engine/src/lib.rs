//! Procedural generation engine for community challenge ("bingo") boards.
//!
//! Given a declarative YAML content configuration - categories with
//! occurrence bounds, weighted snippet libraries, tile templates, a
//! difficulty catalog and numeric value providers - the engine builds a
//! rectangular board of text challenge tiles whose average difficulty
//! converges toward a caller-specified target.
//!
//! ## Core Concepts
//!
//! - **Category**: a named occurrence constraint tracked across the board
//! - **Template**: a weighted text pattern with placeholders and tags
//! - **Snippet**: a weighted fragment substituted into templates recursively
//! - **Value provider**: a numeric-literal source keyed by difficulty level
//! - **Board generator**: a fill / trim / refill local search with rollback
//!
//! Generation is best-effort, never exact: category constraints that cannot
//! be satisfied are relaxed, and the search only guarantees the final board
//! is no further from the target than its own starting fill.
//!
//! ```no_run
//! use bingo_forge_engine::{BoardGenerator, ContentConfig};
//!
//! # fn main() -> Result<(), bingo_forge_engine::ConfigError> {
//! let config = ContentConfig::load("content.yaml")?;
//! let board = BoardGenerator::new(&config)
//!     .with_size(5, 5)
//!     .with_target_difficulty(2.0)
//!     .generate_seeded(0xb1060);
//! println!("mean difficulty {}", board.difficulty);
//! # Ok(())
//! # }
//! ```

mod category;
mod config;
mod error;
mod factory;
mod generator;
mod snippet;

pub use category::{Category, CategoryTable};
pub use config::{
    ContentConfig, DifficultyLevel, TextSnippet, TileTemplate, ValueProvider, ValueRange,
};
pub use error::{ConfigError, ConfigResult};
pub use generator::BoardGenerator;
