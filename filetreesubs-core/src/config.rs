//! YAML configuration loading.
//!
//! # Document shape
//!
//! ```yaml
//! source: input                  # default "input"
//! destination: output            # default "output"
//! substitutes:
//!   '.*\.html$':
//!     '{{header}}': { file: header.html }
//!     '{{title}}': { text: Foo }
//! substitute_chains:
//!   - template: header.html
//!     substitutes:
//!       '{{menu}}': { file: menu.html }
//! create_index_filename: index.html
//! create_index_content: ''
//! encoding: utf-8
//! state_file: .filetreesubs-state.json
//! ```
//!
//! Replacement values are checked here, at the boundary: anything other than a
//! single-field `file` / `text` mapping with a string value is a
//! [`ConfigError::InvalidDefinition`].

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::ConfigError;
use crate::types::{
    Config, PatternRule, ReplacementDefinition, ReplacementKey, ReplacementMap, SubstitutionChain,
};

// ---------------------------------------------------------------------------
// 1. Raw document
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    substitutes: Option<IndexMap<String, Option<IndexMap<String, Value>>>>,
    substitute_chains: Option<Vec<Value>>,
    create_index_filename: Option<String>,
    create_index_content: Option<String>,
    encoding: Option<String>,
    state_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

impl Config {
    /// Load and validate the configuration at `path`.
    ///
    /// Returns `ConfigError::NotFound` if absent,
    /// `ConfigError::Parse` (with path + line context) if malformed YAML.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse(&contents, path)
    }

    /// Parse a configuration from an in-memory YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Config, ConfigError> {
        parse(text, Path::new("<inline>"))
    }

    /// Resolve the `encoding` label.
    pub fn text_encoding(&self) -> Result<&'static Encoding, ConfigError> {
        Encoding::for_label(self.encoding.trim().as_bytes()).ok_or_else(|| {
            ConfigError::UnknownEncoding {
                label: self.encoding.clone(),
            }
        })
    }
}

fn parse(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let parse_err = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };

    // An empty document (or one holding only comments) means "all defaults".
    let document: Value = serde_yaml::from_str(text).map_err(parse_err)?;
    let raw: RawConfig = if document.is_null() {
        RawConfig::default()
    } else {
        serde_yaml::from_str(text).map_err(parse_err)?
    };

    let mut config = Config::default();
    if let Some(source) = raw.source {
        config.source = source;
    }
    if let Some(destination) = raw.destination {
        config.destination = destination;
    }
    for (pattern, substitutes) in raw.substitutes.unwrap_or_default() {
        let mut map = ReplacementMap::new();
        for (key, value) in substitutes.unwrap_or_default() {
            let definition = definition_from_value(&key, &value)?;
            map.insert(ReplacementKey::from(key), definition);
        }
        config.substitutes.push(PatternRule {
            pattern,
            substitutes: map,
        });
    }
    for (index, value) in raw.substitute_chains.unwrap_or_default().iter().enumerate() {
        config.substitute_chains.push(chain_from_value(index, value)?);
    }
    config.create_index_filename = raw.create_index_filename;
    if let Some(content) = raw.create_index_content {
        config.create_index_content = content;
    }
    if let Some(encoding) = raw.encoding {
        config.encoding = encoding;
    }
    if let Some(state_file) = raw.state_file {
        config.state_file = state_file;
    }

    config.text_encoding()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// 3. Boundary validation
// ---------------------------------------------------------------------------

/// Convert one replacement value into a [`ReplacementDefinition`].
pub(crate) fn definition_from_value(key: &str, value: &Value) -> Result<ReplacementDefinition, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidDefinition {
        key: key.to_string(),
        reason,
    };

    let Value::Mapping(map) = value else {
        return Err(invalid(format!(
            "expected a mapping with a single `file` or `text` entry, found {}",
            describe(value)
        )));
    };
    let mut entries = map.iter();
    let (Some((field, inner)), None) = (entries.next(), entries.next()) else {
        return Err(invalid(format!(
            "expected exactly one of `file` or `text`, found {} entries",
            map.len()
        )));
    };

    let field = field
        .as_str()
        .ok_or_else(|| invalid(format!("field name must be a string, found {}", describe(field))))?;
    let inner = inner.as_str().ok_or_else(|| {
        invalid(format!("`{field}` must be a string, found {}", describe(inner)))
    })?;

    match field {
        "file" if inner.is_empty() => Err(invalid("`file` must not be empty".to_string())),
        "file" => Ok(ReplacementDefinition::File(PathBuf::from(inner))),
        "text" => Ok(ReplacementDefinition::Text(inner.to_string())),
        other => Err(invalid(format!(
            "unknown field `{other}`; expected `file` or `text`"
        ))),
    }
}

fn chain_from_value(index: usize, value: &Value) -> Result<SubstitutionChain, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidChain {
        index,
        reason: reason.to_string(),
    };

    let Value::Mapping(map) = value else {
        return Err(invalid("expected a mapping with `template` and `substitutes`"));
    };
    for field in map.keys() {
        match field.as_str() {
            Some("template") | Some("substitutes") => {}
            Some(other) => {
                return Err(invalid(&format!(
                    "unknown field `{other}`; expected `template` and `substitutes`"
                )))
            }
            None => return Err(invalid("field names must be strings")),
        }
    }

    let template = map
        .get("template")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| invalid("missing string `template`"))?;

    let substitutes = match map.get("substitutes") {
        Some(Value::Mapping(entries)) => replacement_map(index, entries)?,
        Some(_) => return Err(invalid("`substitutes` must be a mapping")),
        None => return Err(invalid("missing `substitutes`")),
    };

    Ok(SubstitutionChain {
        template: PathBuf::from(template),
        substitutes,
    })
}

fn replacement_map(index: usize, entries: &Mapping) -> Result<ReplacementMap, ConfigError> {
    let mut map = ReplacementMap::new();
    for (key, value) in entries {
        let key = key.as_str().ok_or_else(|| ConfigError::InvalidChain {
            index,
            reason: "substitution keys must be strings".to_string(),
        })?;
        map.insert(ReplacementKey::from(key), definition_from_value(key, value)?);
    }
    Ok(map)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
