//! Recursive placeholder substitution.
//!
//! Template and snippet texts embed `{{type}}` placeholder tokens. Each
//! token names either a snippet library (substituted with a weighted-random
//! snippet, filtered by the current category constraints) or a numeric
//! value provider (substituted with a literal keyed to the nearest
//! difficulty level). Substituted snippet text may introduce further
//! placeholders; expansion rescans until nothing resolvable remains.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use tracing::warn;

use bingo_forge_core::pick_weighted;

use crate::config::{ContentConfig, TextSnippet};

/// Matches one `{{snippet type}}` placeholder token.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").unwrap());

/// Hard cap on substitutions per expansion, so a self-referential snippet
/// library terminates instead of looping forever.
const MAX_SUBSTITUTIONS: usize = 256;

/// Result of expanding one template text.
#[derive(Debug, Clone)]
pub(crate) struct Expansion {
    /// Text with every resolvable placeholder substituted.
    pub text: String,
    /// Sum of all substituted snippet and value-provider deltas.
    pub difficulty: f64,
    /// Union of the categories of every substituted snippet.
    pub categories: BTreeSet<String>,
}

/// Every snippet-type name referenced by placeholders in `text`.
pub(crate) fn referenced_types(text: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|capture| capture[1].to_string())
        .collect()
}

/// Expand `template_text`, drawing snippets that satisfy the current
/// must-include / must-exclude category sets where possible.
///
/// Filters that empty a candidate list are discarded and the full library
/// used instead - relaxation, not failure. Placeholders naming neither a
/// snippet library nor a value provider are left untouched.
pub(crate) fn expand<R: Rng + ?Sized>(
    config: &ContentConfig,
    template_text: &str,
    must_include: &BTreeSet<String>,
    must_exclude: &BTreeSet<String>,
    target: Option<f64>,
    rng: &mut R,
) -> Expansion {
    let mut text = template_text.to_string();
    let mut difficulty = 0.0;
    let mut categories = BTreeSet::new();
    let mut substitutions = 0;

    'rescan: loop {
        if substitutions >= MAX_SUBSTITUTIONS {
            warn!(template = template_text, "substitution_cap_reached");
            break;
        }

        let tokens: Vec<(String, String)> = PLACEHOLDER
            .captures_iter(&text)
            .map(|capture| (capture[0].to_string(), capture[1].to_string()))
            .collect();

        for (token, kind) in tokens {
            if let Some(library) = config.snippet_library(&kind) {
                let mut candidates: Vec<&TextSnippet> = library.iter().collect();
                if !must_include.is_empty() {
                    candidates.retain(|s| s.categories.iter().any(|c| must_include.contains(c)));
                }
                if !must_exclude.is_empty() {
                    candidates.retain(|s| !s.categories.iter().any(|c| must_exclude.contains(c)));
                }
                if candidates.is_empty() {
                    warn!(snippet_type = %kind, "snippet_filter_relaxed");
                    candidates = library.iter().collect();
                }
                // An empty library leaves the token unresolved.
                let Some(snippet) = pick_weighted(&candidates, rng) else {
                    continue;
                };
                difficulty += snippet.difficulty;
                categories.extend(snippet.categories.iter().cloned());
                text = text.replacen(&token, &snippet.text, 1);
            } else if let Some(provider) = config.value_provider(&kind) {
                let Some(level) = config.nearest_level(target) else {
                    continue;
                };
                let Some(value) = provider.value_for(&level.name, rng) else {
                    continue;
                };
                difficulty += level.score;
                text = text.replacen(&token, &value.to_string(), 1);
            } else {
                continue;
            }
            substitutions += 1;
            continue 'rescan;
        }

        // No token resolved in a full scan; expansion is finished.
        break;
    }

    Expansion {
        text,
        difficulty,
        categories,
    }
}
