//! Error types for filetreesubs-sync.

use std::path::PathBuf;

use thiserror::Error;

use filetreesubs_core::ConfigError;

/// All errors that can arise while planning or executing a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from configuration loading or validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The same key is bound to two different definitions.
    #[error("{origin}: substitution '{key}' is already used somewhere else with a different meaning")]
    Conflict { origin: String, key: String },

    /// A replacement source file is missing from the top level of the source tree.
    #[error("unknown substitution file '{file}' in '{source_root}'")]
    MissingReplacementSource { file: PathBuf, source_root: PathBuf },

    /// The source root does not exist.
    #[error("source directory {path} does not exist")]
    SourceNotFound { path: PathBuf },

    /// A pattern rule is not a valid regular expression.
    #[error("invalid substitution pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File bytes are not valid in the configured encoding.
    #[error("cannot decode {path} as {encoding}")]
    Decode { path: PathBuf, encoding: &'static str },

    /// Text contains characters the configured encoding cannot represent.
    #[error("cannot encode content for {path} as {encoding}")]
    Encode { path: PathBuf, encoding: &'static str },

    /// A file's keys include one the registry never resolved.
    #[error("substitution key '{key}' is not registered")]
    UnknownKey { key: String },

    /// Two tasks would write the same destination path.
    #[error("more than one task writes {path}")]
    DuplicateOutput { path: PathBuf },

    /// A task failed while the executor ran it.
    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<SyncError>,
    },

    /// JSON serialization/deserialization error (state store).
    #[error("state store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
