//! Domain types for filetreesubs configuration.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Replacement definitions are validated when the configuration is loaded
//! (see [`crate::config`]), so every value of these types is well-formed.

use std::borrow::Borrow;
use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A substitution key: the literal token searched for in template text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplacementKey(pub String);

impl ReplacementKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReplacementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ReplacementKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReplacementKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Borrow<str> for ReplacementKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Replacement definitions
// ---------------------------------------------------------------------------

/// Where the content for a replacement key comes from.
///
/// Compared structurally: two definitions conflict when they differ here,
/// regardless of what content they would resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReplacementDefinition {
    /// Content of a file, relative to the source root.
    File(PathBuf),
    /// Literal text.
    Text(String),
}

impl fmt::Display for ReplacementDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementDefinition::File(path) => write!(f, "{{file: {}}}", path.display()),
            ReplacementDefinition::Text(text) => write!(f, "{{text: {text:?}}}"),
        }
    }
}

/// Ordered key → definition mapping, in configuration document order.
pub type ReplacementMap = IndexMap<ReplacementKey, ReplacementDefinition>;

/// A regex pattern and the replacements applied to every source file it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRule {
    /// Regex matched against the source-relative path, anchored at position 0.
    pub pattern: String,
    pub substitutes: ReplacementMap,
}

/// A template file whose own replacement content gets further keys substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionChain {
    /// Template path, relative to the source root.
    pub template: PathBuf,
    pub substitutes: ReplacementMap,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_CONFIG_FILENAME: &str = "filetreesubs-config.yaml";
pub const DEFAULT_SOURCE: &str = "input";
pub const DEFAULT_DESTINATION: &str = "output";
pub const DEFAULT_ENCODING: &str = "utf-8";
pub const DEFAULT_STATE_FILE: &str = ".filetreesubs-state.json";

/// Fully validated run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of the tree to read from.
    pub source: PathBuf,
    /// Root of the tree to reconcile.
    pub destination: PathBuf,
    /// Pattern rules in document order.
    pub substitutes: Vec<PatternRule>,
    pub substitute_chains: Vec<SubstitutionChain>,
    /// Index file synthesized in every source directory lacking one.
    pub create_index_filename: Option<String>,
    pub create_index_content: String,
    /// Encoding label used for every text read and write.
    pub encoding: String,
    /// Where the executor persists per-task dependency hashes.
    pub state_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            destination: PathBuf::from(DEFAULT_DESTINATION),
            substitutes: vec![],
            substitute_chains: vec![],
            create_index_filename: None,
            create_index_content: String::new(),
            encoding: DEFAULT_ENCODING.to_string(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
