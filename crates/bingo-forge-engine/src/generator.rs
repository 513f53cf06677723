//! Difficulty-targeted board construction.
//!
//! The generator runs a fill / trim / refill local search over one mutable
//! tile list: every iteration fills the board, snapshots it, removes a few
//! tiles (most- or least-difficult first, depending on which side of the
//! target the average sits), refills, and keeps whichever of the two boards
//! sits closer to the target. A rejected iteration gets one rescue attempt
//! with a small random churn before reverting to the snapshot wholesale, so
//! an accepted board is never worse than the one it replaced.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use bingo_forge_core::{Board, Tile};

use crate::config::ContentConfig;
use crate::factory::generate_tile;

/// Board construction driver over an immutable content configuration.
///
/// All randomness flows through the `Rng` handed to [`generate`]; a given
/// seed reproduces a given board exactly.
///
/// [`generate`]: BoardGenerator::generate
pub struct BoardGenerator<'a> {
    config: &'a ContentConfig,
    width: usize,
    height: usize,
    target_difficulty: Option<f64>,
    max_attempts: Option<usize>,
}

impl<'a> BoardGenerator<'a> {
    /// A 5x5 generator targeting difficulty 2.0.
    pub fn new(config: &'a ContentConfig) -> Self {
        Self {
            config,
            width: 5,
            height: 5,
            target_difficulty: Some(2.0),
            max_attempts: None,
        }
    }

    /// Set the board dimensions.
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Target a mean tile difficulty.
    pub fn with_target_difficulty(mut self, target: f64) -> Self {
        self.target_difficulty = Some(target);
        self
    }

    /// Target the score of a named difficulty level from the catalog.
    pub fn with_difficulty_level_name(mut self, name: &str) -> Self {
        self.target_difficulty = Some(self.config.difficulty_for_level_name(name));
        self
    }

    /// Target the score of a 1-based difficulty level index.
    pub fn with_difficulty_level(mut self, level: usize) -> Self {
        self.target_difficulty = Some(self.config.difficulty_for_level_index(level));
        self
    }

    /// Drop the difficulty target: fill the board once, weights only, with
    /// no category bound enforcement and no refinement loop.
    pub fn unconstrained(mut self) -> Self {
        self.target_difficulty = None;
        self
    }

    /// Override the derived refinement iteration count.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Generate a board, drawing all randomness from `rng`.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Board {
        let capacity = self.width * self.height;
        let attempts = self
            .max_attempts
            .unwrap_or_else(|| derived_attempts(capacity));

        info!(
            width = self.width,
            height = self.height,
            target = ?self.target_difficulty,
            attempts,
            "board_generation_start"
        );

        let mut tiles: Vec<Tile> = Vec::with_capacity(capacity);
        match self.target_difficulty {
            None => self.fill(&mut tiles, capacity, rng),
            Some(target) => {
                for _ in 0..attempts {
                    self.improve(&mut tiles, capacity, target, rng);
                }
            }
        }

        tiles.shuffle(rng);
        let category_counts = self.config.count_categories(&tiles);
        let difficulty = Board::mean_difficulty(&tiles);

        info!(difficulty, "board_generation_complete");

        Board {
            width: self.width,
            height: self.height,
            tiles,
            category_counts,
            difficulty,
            metadata: self.config.metadata().clone(),
        }
    }

    /// Generate reproducibly from a seed.
    pub fn generate_seeded(&self, seed: u64) -> Board {
        self.generate(&mut StdRng::seed_from_u64(seed))
    }

    /// One fill / trim / refill iteration with rollback.
    fn improve<R: Rng + ?Sized>(
        &self,
        tiles: &mut Vec<Tile>,
        capacity: usize,
        target: f64,
        rng: &mut R,
    ) {
        self.fill(tiles, capacity, rng);
        let backup = tiles.clone();
        let old_distance = (Board::mean_difficulty(&backup) - target).abs();

        remove_by_difficulty(tiles, (self.width + self.height) / 2, target);
        self.fill(tiles, capacity, rng);
        let new_distance = (Board::mean_difficulty(tiles) - target).abs();

        if new_distance > old_distance {
            // Rescue attempt: retry from the snapshot with a small random
            // churn before giving up on this iteration.
            *tiles = backup.clone();
            remove_random(tiles, 2, rng);
            self.fill(tiles, capacity, rng);
            let rescue_distance = (Board::mean_difficulty(tiles) - target).abs();
            if rescue_distance > old_distance {
                *tiles = backup;
            } else if rescue_distance < old_distance {
                debug!(
                    from = old_distance,
                    to = rescue_distance,
                    "board_improved"
                );
            }
        } else if new_distance < old_distance {
            debug!(from = old_distance, to = new_distance, "board_improved");
        }
    }

    fn fill<R: Rng + ?Sized>(&self, tiles: &mut Vec<Tile>, capacity: usize, rng: &mut R) {
        while tiles.len() < capacity {
            let tile = generate_tile(self.config, tiles, capacity, self.target_difficulty, rng);
            tiles.push(tile);
        }
    }
}

/// Remove up to `amount` tiles, always taking from whichever end of the
/// difficulty ordering pulls the running average toward the target.
fn remove_by_difficulty(tiles: &mut Vec<Tile>, amount: usize, target: f64) {
    tiles.sort_by(|a, b| {
        b.difficulty
            .partial_cmp(&a.difficulty)
            .unwrap_or(Ordering::Equal)
    });
    for _ in 0..amount {
        if tiles.is_empty() {
            break;
        }
        if Board::mean_difficulty(tiles) > target {
            // Over target: drop the most difficult tile.
            tiles.remove(0);
        } else {
            tiles.pop();
        }
    }
}

/// Remove up to `amount` tiles chosen uniformly at random.
fn remove_random<R: Rng + ?Sized>(tiles: &mut Vec<Tile>, amount: usize, rng: &mut R) {
    for _ in 0..amount {
        if tiles.is_empty() {
            break;
        }
        let index = rng.random_range(0..tiles.len());
        tiles.remove(index);
    }
}

/// Refinement iterations when no override is given. Small boards get many
/// iterations, large boards few, with a floor of 10.
fn derived_attempts(capacity: usize) -> usize {
    2000 / capacity.saturating_sub(10).max(1) + 10
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentConfig;

    fn config(document: &str) -> ContentConfig {
        ContentConfig::from_yaml(document).unwrap()
    }

    #[test]
    fn derived_attempts_formula() {
        assert_eq!(derived_attempts(25), 143);
        assert_eq!(derived_attempts(100), 32);
        // Tiny boards bottom out at the divisor floor.
        assert_eq!(derived_attempts(1), 2010);
        assert_eq!(derived_attempts(10), 2010);
    }

    #[test]
    fn remove_by_difficulty_trims_toward_the_target() {
        let mut tiles = vec![
            Tile::new("hard", 5.0),
            Tile::new("medium", 2.0),
            Tile::new("easy", 1.0),
        ];
        // Average 2.67 is above target 1.0, so the hardest goes first.
        remove_by_difficulty(&mut tiles, 1, 1.0);
        assert_eq!(tiles.len(), 2);
        assert!(tiles.iter().all(|t| t.text != "hard"));

        // Average 1.5 is below target 5.0, so the easiest goes next.
        remove_by_difficulty(&mut tiles, 1, 5.0);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].text, "medium");
    }

    const BOUNDED_DOCUMENT: &str = r#"
categories:
  alpha:
    min:
      absolute: 2
    max:
      absolute: 4
tile generators:
  - text: "Alpha task"
    difficulty: 1.0
    weight: 1
    categories:
      - alpha
  - text: "Plain task"
    difficulty: 1.0
    weight: 1
"#;

    #[test]
    fn bounded_category_lands_between_its_limits() {
        let config = config(BOUNDED_DOCUMENT);
        let board = BoardGenerator::new(&config)
            .with_size(5, 5)
            .with_target_difficulty(1.0)
            .generate_seeded(42);

        assert_eq!(board.tiles.len(), 25);
        let alpha = board.category_counts.get("alpha").copied().unwrap();
        assert!((2..=4).contains(&alpha), "alpha count {alpha}");
        assert_eq!(board.difficulty, 1.0);
    }

    #[test]
    fn same_seed_reproduces_the_same_board() {
        let config = config(BOUNDED_DOCUMENT);
        let generator = BoardGenerator::new(&config)
            .with_size(4, 4)
            .with_target_difficulty(1.0)
            .with_max_attempts(5);
        assert_eq!(generator.generate_seeded(7), generator.generate_seeded(7));
        assert_eq!(
            generator.generate_seeded(7).tiles.len(),
            generator.generate_seeded(8).tiles.len()
        );
    }

    #[test]
    fn unconstrained_mode_skips_bound_enforcement() {
        let config = config(
            r#"
categories:
  alpha:
    min:
      absolute: 25
tile generators:
  - text: "Alpha task"
    difficulty: 1.0
    weight: 0.0
    categories:
      - alpha
  - text: "Plain task"
    difficulty: 1.0
    weight: 1
"#,
        );
        let unconstrained = BoardGenerator::new(&config)
            .with_size(5, 5)
            .unconstrained()
            .generate_seeded(9);
        assert_eq!(unconstrained.tiles.len(), 25);
        assert_eq!(unconstrained.category_counts.get("alpha"), Some(&0));

        // With a target the same bound forces every tile into `alpha`, even
        // though its template weight is zero.
        let targeted = BoardGenerator::new(&config)
            .with_size(5, 5)
            .with_target_difficulty(1.0)
            .with_max_attempts(2)
            .generate_seeded(9);
        assert_eq!(targeted.category_counts.get("alpha"), Some(&25));
    }

    #[test]
    fn difficulty_level_targets_resolve_through_the_catalog() {
        let config = config(
            r#"
tile generators:
  - text: "Task"
    difficulty: 2.0
    weight: 1
difficulty:
  - name: easy
    score: 1
  - name: hard
    score: 2
"#,
        );
        let board = BoardGenerator::new(&config)
            .with_size(3, 3)
            .with_difficulty_level_name("hard")
            .with_max_attempts(3)
            .generate_seeded(30);
        assert_eq!(board.difficulty, 2.0);

        let by_index = BoardGenerator::new(&config)
            .with_size(3, 3)
            .with_difficulty_level(2)
            .with_max_attempts(3)
            .generate_seeded(30);
        assert_eq!(by_index.difficulty, 2.0);
    }

    #[test]
    fn metadata_passes_through_to_the_board() {
        let config = config(
            r#"
tile generators:
  - text: "Task"
    difficulty: 1.0
    weight: 1
metadata:
  game: outer_wilds
  revision: 3
"#,
        );
        let board = BoardGenerator::new(&config)
            .with_size(2, 2)
            .unconstrained()
            .generate_seeded(31);
        assert_eq!(
            board.metadata.get("game"),
            Some(&serde_json::Value::from("outer_wilds"))
        );
        assert_eq!(
            board.metadata.get("revision"),
            Some(&serde_json::Value::from(3))
        );
    }

    #[test]
    fn generated_board_round_trips_through_interchange() {
        let config = config(BOUNDED_DOCUMENT);
        let board = BoardGenerator::new(&config)
            .with_size(3, 3)
            .with_target_difficulty(1.0)
            .with_max_attempts(2)
            .generate_seeded(32);
        let json = serde_json::to_string(&board).unwrap();
        let parsed: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, board);
    }
}
