//! Error types for configuration loading.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading and resolving a content configuration.
///
/// Loading fails fast: no partial configuration is ever returned. Generation
/// itself never fails - constraint conflicts are relaxed, not raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An entry inside a section failed shape validation; the source error
    /// names the offending key.
    #[error("invalid entry in `{section}`: {source}")]
    InvalidEntry {
        section: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    /// A field parsed cleanly but holds an impossible value.
    #[error("field `{key}` in {context}: {message}")]
    InvalidField {
        key: &'static str,
        context: String,
        message: String,
    },

    /// A section the engine cannot work without is missing or empty.
    #[error("section `{section}` must contain at least one entry")]
    EmptySection { section: &'static str },

    /// The document is not well-formed YAML or not a mapping at top level.
    #[error("configuration parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// I/O error reading a configuration source; propagated unchanged.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
