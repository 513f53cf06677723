//! Core domain types shared across the entire Bingo-Forge workspace.
//!
//! This crate holds the plain data entities produced by the generation
//! engine - [`Tile`] and [`Board`] - together with the board interchange
//! (de)serialization and the weighted random selection primitive shared by
//! every weighted entity in the configuration model.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// Weighted Selection
// =============================================================================

/// Capability for anything that can take part in a weighted random draw.
///
/// Templates, snippets and other configuration entities all carry a
/// non-negative selection weight; the draw algorithm is implemented once,
/// generically, against this trait.
pub trait Weighted {
    /// Selection weight. Non-negative; `0.0` means "never preferred".
    fn weight(&self) -> f64;
}

impl<T: Weighted + ?Sized> Weighted for &T {
    fn weight(&self) -> f64 {
        (**self).weight()
    }
}

/// Draw one item from `items` with probability proportional to its weight.
///
/// Returns `None` for an empty collection. If the total weight is zero the
/// first item is returned instead of failing - callers must not assume a
/// meaningful distribution in degenerate cases.
pub fn pick_weighted<'a, T, R>(items: &'a [T], rng: &mut R) -> Option<&'a T>
where
    T: Weighted,
    R: Rng + ?Sized,
{
    if items.is_empty() {
        return None;
    }
    let total: f64 = items.iter().map(|item| item.weight()).sum();
    if total <= 0.0 {
        return items.first();
    }
    let draw = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for item in items {
        cumulative += item.weight();
        if cumulative >= draw {
            return Some(item);
        }
    }
    items.first()
}

// =============================================================================
// Tile
// =============================================================================

/// One resolved cell of a generated board.
///
/// Serializes to the interchange shape consumed by presentation and upload
/// collaborators: `text`, optional `tooltip`, `difficulty`, `categories`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Final challenge text with all placeholders resolved.
    pub text: String,
    /// Optional hover text carried over from the tile template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    /// Template delta plus all resolved snippet / value-provider deltas.
    pub difficulty: f64,
    /// Category names this tile counts toward.
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

impl Tile {
    /// Create a tile with no tooltip and no categories.
    pub fn new(text: impl Into<String>, difficulty: f64) -> Self {
        Self {
            text: text.into(),
            tooltip: None,
            difficulty,
            categories: BTreeSet::new(),
        }
    }

    /// Attach a tooltip.
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Tag this tile with a category name. Duplicates are ignored.
    pub fn add_category(&mut self, name: impl Into<String>) {
        self.categories.insert(name.into());
    }

    /// Whether this tile carries any of the given category names.
    pub fn has_any_category(&self, names: &BTreeSet<String>) -> bool {
        self.categories.iter().any(|c| names.contains(c))
    }

    /// Digit-insensitive text comparison.
    ///
    /// Two tiles whose texts differ only in embedded (optionally signed)
    /// numbers compare equal, so consumers can match a re-rolled numeric
    /// tile against its original.
    pub fn is_text_equivalent(&self, other: &str) -> bool {
        strip_numbers(&self.text).eq_ignore_ascii_case(&strip_numbers(other))
    }
}

/// Remove every digit, and any `-` sign directly in front of a digit.
fn strip_numbers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' && chars.peek().is_some_and(char::is_ascii_digit) {
            continue;
        }
        if c.is_ascii_digit() {
            continue;
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Board
// =============================================================================

/// A fully generated board: `width x height` tiles plus aggregate metadata.
///
/// Tiles are stored row-major; `(x, y)` maps to index `y * width + x`.
/// The serialized form is the interchange format of the board store and
/// presentation collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<Tile>,
    /// Occurrence count per known category name (zero entries included).
    #[serde(rename = "categories", default)]
    pub category_counts: BTreeMap<String, usize>,
    /// Mean tile difficulty.
    pub difficulty: f64,
    /// Pass-through metadata from the configuration.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Board {
    /// Number of cells on the board.
    pub fn size(&self) -> usize {
        self.width * self.height
    }

    /// Tile at `(x, y)`, or `None` when out of bounds.
    pub fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get(y * self.width + x)
    }

    /// Iterate one row of tiles.
    pub fn row(&self, y: usize) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().skip(y * self.width).take(self.width)
    }

    /// Mean difficulty over a tile slice; `0.0` for an empty slice.
    pub fn mean_difficulty(tiles: &[Tile]) -> f64 {
        if tiles.is_empty() {
            return 0.0;
        }
        tiles.iter().map(|t| t.difficulty).sum::<f64>() / tiles.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Item {
        name: &'static str,
        weight: f64,
    }

    impl Weighted for Item {
        fn weight(&self) -> f64 {
            self.weight
        }
    }

    #[test]
    fn pick_from_empty_returns_none() {
        let items: Vec<Item> = Vec::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pick_weighted(&items, &mut rng).is_none());
    }

    #[test]
    fn pick_single_element_regardless_of_weight() {
        let items = vec![Item {
            name: "only",
            weight: 0.0,
        }];
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..10 {
            assert_eq!(pick_weighted(&items, &mut rng).unwrap().name, "only");
        }
    }

    #[test]
    fn pick_zero_total_weight_falls_back_to_first() {
        let items = vec![
            Item {
                name: "first",
                weight: 0.0,
            },
            Item {
                name: "second",
                weight: 0.0,
            },
        ];
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(pick_weighted(&items, &mut rng).unwrap().name, "first");
    }

    #[test]
    fn pick_never_selects_zero_weight_among_weighted() {
        let items = vec![
            Item {
                name: "never",
                weight: 0.0,
            },
            Item {
                name: "always",
                weight: 1.0,
            },
        ];
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..100 {
            assert_eq!(pick_weighted(&items, &mut rng).unwrap().name, "always");
        }
    }

    #[test]
    fn pick_works_through_references() {
        let items = vec![
            Item {
                name: "a",
                weight: 1.0,
            },
            Item {
                name: "b",
                weight: 2.0,
            },
        ];
        let refs: Vec<&Item> = items.iter().collect();
        let mut rng = StdRng::seed_from_u64(5);
        assert!(pick_weighted(&refs, &mut rng).is_some());
    }

    #[test]
    fn text_equivalence_ignores_numbers_and_case() {
        let tile = Tile::new("Collect 5 rocks", 1.0);
        assert!(tile.is_text_equivalent("collect 12 Rocks"));
        assert!(!tile.is_text_equivalent("collect 12 sticks"));
    }

    #[test]
    fn text_equivalence_strips_sign_before_digits() {
        let tile = Tile::new("Reach -5 points", 1.0);
        assert!(tile.is_text_equivalent("Reach 30 points"));
        // A dash not followed by a digit is kept.
        let tile = Tile::new("double-jump 3 times", 1.0);
        assert!(tile.is_text_equivalent("double-jump 7 times"));
        assert!(!tile.is_text_equivalent("double jump 7 times"));
    }

    fn sample_board() -> Board {
        let mut first = Tile::new("Find the lab", 2.5).with_tooltip("Any lab counts");
        first.add_category("exploration");
        let second = Tile::new("Die 3 times", 1.0);
        Board {
            width: 2,
            height: 1,
            tiles: vec![first, second],
            category_counts: BTreeMap::from([("exploration".to_string(), 1)]),
            difficulty: 1.75,
            metadata: BTreeMap::from([("game".to_string(), Value::from("outer_wilds"))]),
        }
    }

    #[test]
    fn board_tile_lookup_is_row_major() {
        let board = sample_board();
        assert_eq!(board.tile(0, 0).unwrap().text, "Find the lab");
        assert_eq!(board.tile(1, 0).unwrap().text, "Die 3 times");
        assert!(board.tile(2, 0).is_none());
        assert!(board.tile(0, 1).is_none());
    }

    #[test]
    fn board_interchange_round_trip() {
        let board = sample_board();
        let json = serde_json::to_string(&board).unwrap();
        let parsed: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, board);
    }

    #[test]
    fn absent_tooltip_is_omitted_from_interchange() {
        let json = serde_json::to_string(&Tile::new("plain", 0.5)).unwrap();
        assert!(!json.contains("tooltip"));
        let parsed: Tile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.tooltip, None);
    }

    #[test]
    fn mean_difficulty_of_empty_slice_is_zero() {
        assert_eq!(Board::mean_difficulty(&[]), 0.0);
    }
}
