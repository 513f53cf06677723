//! Declarative content configuration: schema, parsing and resolution.
//!
//! A configuration is a YAML mapping with five content sections plus free
//! metadata. Loading happens in two phases:
//!
//! 1. The document is deserialized into raw serde structs per entry, so a
//!    malformed entry fails fast with an error naming the offending key and
//!    the enclosing section.
//! 2. The raw entries are resolved in declaration order - categories first
//!    (building the name index), then snippet libraries, tile templates,
//!    difficulty levels and value providers. Category references found on
//!    snippets and templates may name undeclared categories; those are
//!    auto-created with default bounds and a warning. After all libraries
//!    are loaded a second pass recomputes each snippet's derived-category
//!    closure so that a snippet whose text references another snippet type
//!    inherits that type's categories transitively.
//!
//! The resolved [`ContentConfig`] is immutable and may be shared freely
//! across generation calls.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::Path;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use bingo_forge_core::{Tile, Weighted};

use crate::category::{Category, CategoryTable};
use crate::error::{ConfigError, ConfigResult};
use crate::snippet::referenced_types;

// =============================================================================
// Raw document schema
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    categories: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    snippets: BTreeMap<String, Vec<serde_yaml::Value>>,
    #[serde(rename = "tile generators", default)]
    tile_generators: Vec<serde_yaml::Value>,
    #[serde(rename = "difficulty", default)]
    difficulty: Vec<serde_yaml::Value>,
    #[serde(rename = "value providers", default)]
    value_providers: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    #[serde(default)]
    min: Option<RawBound>,
    #[serde(default)]
    max: Option<RawBound>,
    #[serde(default)]
    synergy: Vec<String>,
    #[serde(default)]
    antisynergy: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawBound {
    #[serde(default)]
    absolute: Option<f64>,
    #[serde(default)]
    relative: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawSnippet {
    text: String,
    difficulty: f64,
    weight: f64,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    text: String,
    #[serde(default)]
    tooltip: Option<String>,
    difficulty: f64,
    #[serde(default)]
    difficulties: BTreeMap<String, f64>,
    weight: f64,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawDifficulty {
    name: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct RawValueRange {
    min: i64,
    max: i64,
}

fn entry<T: DeserializeOwned>(
    value: serde_yaml::Value,
    section: &'static str,
) -> ConfigResult<T> {
    serde_yaml::from_value(value).map_err(|source| ConfigError::InvalidEntry { section, source })
}

// =============================================================================
// Resolved entities
// =============================================================================

/// A weighted text pattern that can be expanded into a tile.
#[derive(Debug, Clone)]
pub struct TileTemplate {
    /// Text with zero or more embedded `{{type}}` placeholders.
    pub text: String,
    /// Optional tooltip copied onto generated tiles.
    pub tooltip: Option<String>,
    /// Base difficulty delta.
    pub difficulty: f64,
    /// Per-difficulty-level replacement for the base delta, keyed by level
    /// name; applied via the nearest catalog level when a target is set.
    pub per_level_difficulty: BTreeMap<String, f64>,
    /// Selection weight.
    pub weight: f64,
    /// Explicit category tags.
    pub categories: BTreeSet<String>,
    /// Categories reachable through any snippet type referenced in the
    /// text, computed once at load time.
    pub derived_categories: BTreeSet<String>,
}

impl TileTemplate {
    /// Whether any explicit tag is in `names`.
    pub fn matches_any(&self, names: &BTreeSet<String>) -> bool {
        self.categories.iter().any(|c| names.contains(c))
    }

    /// Whether any explicit tag or derived category is in `names`.
    pub fn reaches_any(&self, names: &BTreeSet<String>) -> bool {
        self.matches_any(names) || self.derived_categories.iter().any(|c| names.contains(c))
    }

    /// Base delta for a generation anchored at `level`; the per-level
    /// override wins when the template declares one for that level.
    pub(crate) fn base_difficulty(&self, level: Option<&DifficultyLevel>) -> f64 {
        level
            .and_then(|l| self.per_level_difficulty.get(&l.name))
            .copied()
            .unwrap_or(self.difficulty)
    }
}

impl Weighted for TileTemplate {
    fn weight(&self) -> f64 {
        self.weight
    }
}

/// A weighted text fragment belonging to a named snippet library.
#[derive(Debug, Clone)]
pub struct TextSnippet {
    /// Fragment text; may itself contain placeholders.
    pub text: String,
    /// Difficulty delta contributed when this snippet is substituted.
    pub difficulty: f64,
    /// Selection weight.
    pub weight: f64,
    /// Category tags, extended at load time with the categories of every
    /// snippet type this snippet's text references.
    pub categories: BTreeSet<String>,
}

impl Weighted for TextSnippet {
    fn weight(&self) -> f64 {
        self.weight
    }
}

/// A named anchor score in the ordered difficulty catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyLevel {
    pub name: String,
    pub score: f64,
}

/// Inclusive numeric range a value provider draws from.
#[derive(Debug, Clone, Copy)]
pub struct ValueRange {
    pub min: i64,
    pub max: i64,
}

/// A numeric-literal source keyed by difficulty-level name.
#[derive(Debug, Clone)]
pub struct ValueProvider {
    ranges: BTreeMap<String, ValueRange>,
}

impl ValueProvider {
    /// Draw a value for the given difficulty level, or `None` when the
    /// provider declares no range for that level.
    pub fn value_for<R: Rng + ?Sized>(&self, level: &str, rng: &mut R) -> Option<i64> {
        let range = self.ranges.get(level)?;
        Some(rng.random_range(range.min..=range.max))
    }

    /// Range declared for a level, if any.
    pub fn range_for(&self, level: &str) -> Option<ValueRange> {
        self.ranges.get(level).copied()
    }
}

// =============================================================================
// ContentConfig
// =============================================================================

/// The fully resolved, immutable content configuration.
#[derive(Debug)]
pub struct ContentConfig {
    templates: Vec<TileTemplate>,
    snippets: BTreeMap<String, Vec<TextSnippet>>,
    value_providers: BTreeMap<String, ValueProvider>,
    categories: CategoryTable,
    difficulty_levels: Vec<DifficultyLevel>,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl ContentConfig {
    /// Load a configuration from a YAML file. I/O errors propagate
    /// unchanged.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    /// Load a configuration from any reader.
    pub fn from_reader(mut reader: impl Read) -> ConfigResult<Self> {
        let mut document = String::new();
        reader.read_to_string(&mut document)?;
        Self::from_yaml(&document)
    }

    /// Parse and resolve a YAML configuration document.
    pub fn from_yaml(document: &str) -> ConfigResult<Self> {
        let raw: RawDocument = serde_yaml::from_str(document)?;
        Self::resolve(raw)
    }

    fn resolve(raw: RawDocument) -> ConfigResult<Self> {
        // Phase one: declared categories build the name index before
        // anything can reference them.
        let mut categories = CategoryTable::default();
        let mut declared = Vec::with_capacity(raw.categories.len());
        for (name, value) in raw.categories {
            let rc: RawCategory = entry(value, "categories")?;
            let mut category = Category::new(name.clone());
            if let Some(bound) = &rc.min {
                if let Some(v) = bound.absolute {
                    category.min_absolute = v;
                }
                if let Some(v) = bound.relative {
                    category.min_relative = v;
                }
            }
            if let Some(bound) = &rc.max {
                if let Some(v) = bound.absolute {
                    category.max_absolute = v;
                }
                if let Some(v) = bound.relative {
                    category.max_relative = v;
                }
            }
            categories.insert(category);
            declared.push((name, rc));
        }

        // Phase two: resolve synergy references against the complete index,
        // auto-creating any name never declared.
        for (name, rc) in declared {
            for other in &rc.synergy {
                categories.ensure(other, &name);
            }
            for other in &rc.antisynergy {
                categories.ensure(other, &name);
            }
            if let Some(category) = categories.get_mut(&name) {
                category.synergies = rc.synergy.into_iter().collect();
                category.antisynergies = rc.antisynergy.into_iter().collect();
            }
        }

        // Snippet libraries; category tags may auto-create.
        let mut snippets: BTreeMap<String, Vec<TextSnippet>> = BTreeMap::new();
        for (kind, entries) in raw.snippets {
            let mut library = Vec::with_capacity(entries.len());
            for value in entries {
                let rs: RawSnippet = entry(value, "snippets")?;
                let mut tags = BTreeSet::new();
                for tag in rs.categories {
                    categories.ensure(&tag, &format!("snippet library `{kind}`"));
                    tags.insert(tag);
                }
                library.push(TextSnippet {
                    text: rs.text,
                    difficulty: rs.difficulty,
                    weight: rs.weight,
                    categories: tags,
                });
            }
            snippets.insert(kind, library);
        }

        // Second pass over the complete library set: extend each snippet's
        // categories with the closure of every type its text references.
        let closures = snippet_type_closures(&snippets);
        for library in snippets.values_mut() {
            for snippet in library.iter_mut() {
                for kind in referenced_types(&snippet.text) {
                    if let Some(derived) = closures.get(&kind) {
                        snippet.categories.extend(derived.iter().cloned());
                    }
                }
            }
        }

        // Tile templates inherit derived categories from the same closures.
        let mut templates = Vec::with_capacity(raw.tile_generators.len());
        for value in raw.tile_generators {
            let rt: RawTemplate = entry(value, "tile generators")?;
            let mut tags = BTreeSet::new();
            for tag in rt.categories {
                categories.ensure(&tag, "tile generator");
                tags.insert(tag);
            }
            let mut derived = BTreeSet::new();
            for kind in referenced_types(&rt.text) {
                if let Some(set) = closures.get(&kind) {
                    derived.extend(set.iter().cloned());
                }
            }
            templates.push(TileTemplate {
                text: rt.text,
                tooltip: rt.tooltip,
                difficulty: rt.difficulty,
                per_level_difficulty: rt.difficulties,
                weight: rt.weight,
                categories: tags,
                derived_categories: derived,
            });
        }
        if templates.is_empty() {
            return Err(ConfigError::EmptySection {
                section: "tile generators",
            });
        }

        let mut difficulty_levels = Vec::with_capacity(raw.difficulty.len());
        for value in raw.difficulty {
            let rd: RawDifficulty = entry(value, "difficulty")?;
            difficulty_levels.push(DifficultyLevel {
                name: rd.name,
                score: rd.score,
            });
        }

        let mut value_providers = BTreeMap::new();
        for (name, value) in raw.value_providers {
            let raw_ranges: BTreeMap<String, RawValueRange> = entry(value, "value providers")?;
            let mut ranges = BTreeMap::new();
            for (level, range) in raw_ranges {
                if range.min > range.max {
                    return Err(ConfigError::InvalidField {
                        key: "min",
                        context: format!("value provider `{name}`, level `{level}`"),
                        message: format!("min {} exceeds max {}", range.min, range.max),
                    });
                }
                ranges.insert(
                    level,
                    ValueRange {
                        min: range.min,
                        max: range.max,
                    },
                );
            }
            value_providers.insert(name, ValueProvider { ranges });
        }

        info!(
            templates = templates.len(),
            snippet_types = snippets.len(),
            snippets = snippets.values().map(Vec::len).sum::<usize>(),
            value_providers = value_providers.len(),
            categories = categories.len(),
            difficulty_levels = difficulty_levels.len(),
            "configuration_loaded"
        );

        Ok(Self {
            templates,
            snippets,
            value_providers,
            categories,
            difficulty_levels,
            metadata: raw.metadata,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Every tile template, in declaration order.
    pub fn templates(&self) -> &[TileTemplate] {
        &self.templates
    }

    /// The snippet library of a type, if declared.
    pub fn snippet_library(&self, kind: &str) -> Option<&[TextSnippet]> {
        self.snippets.get(kind).map(Vec::as_slice)
    }

    /// The value provider of a name, if declared.
    pub fn value_provider(&self, name: &str) -> Option<&ValueProvider> {
        self.value_providers.get(name)
    }

    /// All known categories, declared and auto-created.
    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    /// The ordered difficulty catalog.
    pub fn difficulty_levels(&self) -> &[DifficultyLevel] {
        &self.difficulty_levels
    }

    /// Pass-through board metadata.
    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    // =========================================================================
    // Difficulty catalog lookups
    // =========================================================================

    /// Score of the level with the given name (case-insensitive); `1.0`
    /// when the name is unknown.
    pub fn difficulty_for_level_name(&self, name: &str) -> f64 {
        self.difficulty_levels
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .map(|l| l.score)
            .unwrap_or(1.0)
    }

    /// Score of the 1-based level index, clamped into the catalog; `1.0`
    /// for an empty catalog.
    pub fn difficulty_for_level_index(&self, level: usize) -> f64 {
        if self.difficulty_levels.is_empty() {
            return 1.0;
        }
        let index = level.clamp(1, self.difficulty_levels.len()) - 1;
        self.difficulty_levels[index].score
    }

    /// The level whose score is nearest to the target. Without a target the
    /// lookup degenerates to the lowest-score level.
    pub fn nearest_level(&self, target: Option<f64>) -> Option<&DifficultyLevel> {
        match target {
            Some(t) => self.difficulty_levels.iter().min_by(|a, b| {
                (a.score - t)
                    .abs()
                    .partial_cmp(&(b.score - t).abs())
                    .unwrap_or(Ordering::Equal)
            }),
            None => self
                .difficulty_levels
                .iter()
                .min_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal)),
        }
    }

    // =========================================================================
    // Board bookkeeping
    // =========================================================================

    /// Occurrence count per known category over the given tiles; every
    /// known category appears, with zero when absent.
    pub fn count_categories(&self, tiles: &[Tile]) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = self
            .categories
            .iter()
            .map(|c| (c.name.clone(), 0))
            .collect();
        for tile in tiles {
            for category in &tile.categories {
                *counts.entry(category.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Category closure per snippet type: each type's set is the union of its
/// snippets' explicit tags plus, transitively, the sets of every type those
/// snippets reference. Iterated to a fixpoint, so reference cycles are safe.
fn snippet_type_closures(
    snippets: &BTreeMap<String, Vec<TextSnippet>>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut sets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut references: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (kind, library) in snippets {
        let mut seed = BTreeSet::new();
        let mut referenced = BTreeSet::new();
        for snippet in library {
            seed.extend(snippet.categories.iter().cloned());
            referenced.extend(referenced_types(&snippet.text));
        }
        sets.insert(kind.clone(), seed);
        references.insert(kind.clone(), referenced);
    }

    loop {
        let mut changed = false;
        for (kind, referenced) in &references {
            let mut merged = sets.get(kind).cloned().unwrap_or_default();
            let before = merged.len();
            for other in referenced {
                if let Some(set) = sets.get(other) {
                    merged.extend(set.iter().cloned());
                }
            }
            if merged.len() != before {
                sets.insert(kind.clone(), merged);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    sets
}
