//! Error types for filetreesubs-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading the configuration file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file did not exist at the expected path.
    #[error("configuration not found at {path}")]
    NotFound { path: PathBuf },

    /// YAML parse error, including file path and line context from serde_yaml.
    #[error("failed to parse configuration at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A replacement value is not a single-field `{file: ...}` or `{text: ...}` mapping.
    #[error("invalid replacement for key '{key}': {reason}")]
    InvalidDefinition { key: String, reason: String },

    /// A `substitute_chains` entry has the wrong shape.
    #[error("invalid substitution chain #{index}: {reason}")]
    InvalidChain { index: usize, reason: String },

    /// The `encoding` label is not known.
    #[error("unknown encoding '{label}'")]
    UnknownEncoding { label: String },
}
