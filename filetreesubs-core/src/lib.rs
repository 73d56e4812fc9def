//! filetreesubs core library: configuration types, loading, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes and configuration structs
//! - [`error`]: [`ConfigError`]
//! - [`config`]: YAML load + boundary validation

pub mod config;
pub mod error;
pub mod types;

pub use error::ConfigError;
pub use types::{
    Config, PatternRule, ReplacementDefinition, ReplacementKey, ReplacementMap, SubstitutionChain,
};
