//! Replacement registry: resolves substitution keys to content.
//!
//! The registry is built fresh for every run from the configuration and is
//! read-only once [`ReplacementRegistry::from_config`] returns.
//!
//! # Resolution
//!
//! 1. Every pattern rule's keys are registered in document order. A key bound
//!    twice to the same definition is a no-op; bound to a different definition
//!    it is a [`SyncError::Conflict`].
//! 2. Substitution chains run afterwards, in order. A chain registers its own
//!    keys the same way, then rewrites the content of every key whose first
//!    dependency is the chain's template file and appends the chain keys'
//!    dependencies. A chain whose template backs no key changes nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use filetreesubs_core::{Config, ReplacementDefinition, ReplacementKey, SubstitutionChain};

use crate::error::SyncError;
use crate::paths;
use crate::substitute::substitute;

/// A registered key: its definition, resolved content and file dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub definition: ReplacementDefinition,
    pub content: String,
    /// Source files the content was built from; the defining file comes first.
    pub dependencies: Vec<PathBuf>,
}

/// Key → resolved content map for one run.
#[derive(Debug)]
pub struct ReplacementRegistry {
    source_root: PathBuf,
    encoding: &'static Encoding,
    entries: BTreeMap<ReplacementKey, Replacement>,
    original_filenames: BTreeSet<PathBuf>,
}

impl ReplacementRegistry {
    pub fn new(source_root: impl Into<PathBuf>, encoding: &'static Encoding) -> Self {
        Self {
            source_root: source_root.into(),
            encoding,
            entries: BTreeMap::new(),
            original_filenames: BTreeSet::new(),
        }
    }

    /// Register every pattern rule and apply every chain of `config`.
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let mut registry = Self::new(&config.source, config.text_encoding()?);
        for rule in &config.substitutes {
            let origin = format!("substitution for pattern '{}'", rule.pattern);
            for (key, definition) in &rule.substitutes {
                registry.register_from(&origin, key, definition)?;
            }
        }
        for chain in &config.substitute_chains {
            registry.apply_chain(chain)?;
        }
        tracing::debug!(
            "resolved {} replacement key(s) from {} source file(s)",
            registry.entries.len(),
            registry.original_filenames.len()
        );
        Ok(registry)
    }

    /// Bind `key` to `definition` and return the files its content depends on.
    pub fn register(
        &mut self,
        key: &ReplacementKey,
        definition: &ReplacementDefinition,
    ) -> Result<Vec<PathBuf>, SyncError> {
        self.register_from("replacement registry", key, definition)
    }

    fn register_from(
        &mut self,
        origin: &str,
        key: &ReplacementKey,
        definition: &ReplacementDefinition,
    ) -> Result<Vec<PathBuf>, SyncError> {
        if let Some(existing) = self.entries.get(key) {
            if existing.definition != *definition {
                return Err(SyncError::Conflict {
                    origin: origin.to_string(),
                    key: key.to_string(),
                });
            }
            return Ok(existing.dependencies.clone());
        }

        let (content, dependencies) = match definition {
            ReplacementDefinition::File(rel) => {
                let path = self.source_root.join(rel);
                let content = paths::read_text(&path, self.encoding)?;
                self.original_filenames.insert(rel.clone());
                (content, vec![path])
            }
            ReplacementDefinition::Text(text) => (text.clone(), vec![]),
        };

        self.entries.insert(
            key.clone(),
            Replacement {
                definition: definition.clone(),
                content,
                dependencies: dependencies.clone(),
            },
        );
        Ok(dependencies)
    }

    /// Apply one substitution chain. Returns how many keys were rewritten.
    pub fn apply_chain(&mut self, chain: &SubstitutionChain) -> Result<usize, SyncError> {
        let origin = format!("substitution chain for '{}'", chain.template.display());
        let mut files = Vec::new();
        for (key, definition) in &chain.substitutes {
            files.extend(self.register_from(&origin, key, definition)?);
        }

        let values: Vec<(String, String)> = chain
            .substitutes
            .keys()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .map(|r| (key.0.clone(), r.content.clone()))
            })
            .collect();

        let template = self.source_root.join(&chain.template);
        let mut rewritten = 0;
        for replacement in self.entries.values_mut() {
            if replacement.dependencies.first() != Some(&template) {
                continue;
            }
            replacement.content = substitute(
                &replacement.content,
                values.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            );
            for file in &files {
                if !replacement.dependencies.contains(file) {
                    replacement.dependencies.push(file.clone());
                }
            }
            rewritten += 1;
        }

        if rewritten == 0 {
            tracing::debug!(
                "chain template {} backs no replacement key; nothing rewritten",
                template.display()
            );
        }
        Ok(rewritten)
    }

    pub fn get(&self, key: &str) -> Option<&Replacement> {
        self.entries.get(key)
    }

    /// Resolved content for `key`.
    pub fn content(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|r| r.content.as_str())
    }

    pub fn dependencies(&self, key: &str) -> Option<&[PathBuf]> {
        self.entries.get(key).map(|r| r.dependencies.as_slice())
    }

    /// Source-relative paths of every file-backed definition.
    ///
    /// These are substitution inputs and are never synced themselves.
    pub fn original_filenames(&self) -> &BTreeSet<PathBuf> {
        &self.original_filenames
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
