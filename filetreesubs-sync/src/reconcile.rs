//! Tree reconciliation: walk source and destination, classify every path.
//!
//! Classification order (the order tasks are later emitted in):
//!
//! 1. Source directories in lexicographic order of their relative path. Per
//!    directory: the synthesized index file first, then every file in
//!    lexicographic order as `Copy` or `Substitute`.
//! 2. Destination-only files, lexicographic.
//! 3. Destination-only directories, reverse lexicographic, so `a/b/c` is
//!    removed before `a/b` and `a/b` before `a`.
//!
//! Both walks follow symbolic links.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use filetreesubs_core::{Config, PatternRule};

use crate::error::{io_err, SyncError};
use crate::paths::{join_rel, relname};
use crate::replacements::ReplacementRegistry;

/// Classification result for one relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    /// Copy the source file verbatim.
    Copy { path: String },
    /// Copy the source file with `keys` substituted.
    Substitute { path: String, keys: BTreeSet<String> },
    /// Write the configured index content.
    CreateIndex { path: String },
    /// Destination file with no source counterpart.
    RemoveFile { path: String },
    /// Destination directory with no source counterpart.
    RemoveDir { path: String },
}

impl TreeEntry {
    /// Relative path this entry applies to.
    pub fn path(&self) -> &str {
        match self {
            TreeEntry::Copy { path }
            | TreeEntry::Substitute { path, .. }
            | TreeEntry::CreateIndex { path }
            | TreeEntry::RemoveFile { path }
            | TreeEntry::RemoveDir { path } => path,
        }
    }
}

// ---------------------------------------------------------------------------
// Pattern matching
// ---------------------------------------------------------------------------

/// Compiled pattern rules, scanned linearly for every file.
#[derive(Debug, Default)]
pub struct PatternMatcher {
    rules: Vec<(Regex, Vec<String>)>,
}

impl PatternMatcher {
    pub fn new(rules: &[PatternRule]) -> Result<Self, SyncError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let regex = Regex::new(&rule.pattern).map_err(|source| SyncError::InvalidPattern {
                pattern: rule.pattern.clone(),
                source,
            })?;
            let keys = rule.substitutes.keys().map(|k| k.0.clone()).collect();
            compiled.push((regex, keys));
        }
        Ok(Self { rules: compiled })
    }

    /// Union of the keys of every rule matching `rel_path` at position 0.
    pub fn keys_for(&self, rel_path: &str) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        for (regex, rule_keys) in &self.rules {
            // Leftmost semantics: a match at 0 exists iff the first match starts at 0.
            if regex.find(rel_path).is_some_and(|m| m.start() == 0) {
                keys.extend(rule_keys.iter().cloned());
            }
        }
        keys
    }
}

// ---------------------------------------------------------------------------
// Walking
// ---------------------------------------------------------------------------

/// Directory relative path → sorted file names, for every directory under `root`.
pub fn walk_tree(root: &Path) -> Result<BTreeMap<String, Vec<String>>, SyncError> {
    let mut dirs: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_err(root, e))?;
        let rel = relname(entry.path(), root)?;
        if entry.file_type().is_dir() {
            dirs.entry(rel).or_default();
            continue;
        }
        let (dir, name) = match rel.rsplit_once('/') {
            Some((dir, name)) => (dir.to_string(), name.to_string()),
            None => (String::new(), rel),
        };
        dirs.entry(dir).or_default().push(name);
    }
    for names in dirs.values_mut() {
        names.sort();
    }
    Ok(dirs)
}

fn walk_err(root: &Path, err: walkdir::Error) -> SyncError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other(message));
    io_err(path, source)
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Compares a source tree against a destination tree.
#[derive(Debug)]
pub struct TreeReconciler {
    source: PathBuf,
    destination: PathBuf,
    matcher: PatternMatcher,
    index_filename: Option<String>,
    replacement_sources: BTreeSet<PathBuf>,
}

impl TreeReconciler {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, matcher: PatternMatcher) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            matcher,
            index_filename: None,
            replacement_sources: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &Config, registry: &ReplacementRegistry) -> Result<Self, SyncError> {
        let matcher = PatternMatcher::new(&config.substitutes)?;
        Ok(Self::new(&config.source, &config.destination, matcher)
            .with_index_filename(config.create_index_filename.clone())
            .with_replacement_sources(registry.original_filenames().clone()))
    }

    /// Synthesize `filename` in every source directory that lacks it.
    pub fn with_index_filename(mut self, filename: Option<String>) -> Self {
        self.index_filename = filename;
        self
    }

    /// Files at the source root that feed replacements and are not synced.
    pub fn with_replacement_sources(mut self, sources: BTreeSet<PathBuf>) -> Self {
        self.replacement_sources = sources;
        self
    }

    /// Classify every path. See the module docs for the ordering.
    pub fn reconcile(&self) -> Result<Vec<TreeEntry>, SyncError> {
        if !self.source.is_dir() {
            return Err(SyncError::SourceNotFound {
                path: self.source.clone(),
            });
        }

        let mut dest_dirs = BTreeSet::new();
        let mut dest_files = BTreeSet::new();
        if self.destination.exists() {
            for (dir, names) in walk_tree(&self.destination)? {
                for name in &names {
                    dest_files.insert(join_rel(&dir, name));
                }
                dest_dirs.insert(dir);
            }
        }

        let mut entries = Vec::new();
        for (dir, mut names) in walk_tree(&self.source)? {
            dest_dirs.remove(&dir);

            if let Some(index) = &self.index_filename {
                if !names.iter().any(|name| name == index) {
                    let path = join_rel(&dir, index);
                    dest_files.remove(&path);
                    entries.push(TreeEntry::CreateIndex { path });
                }
            }

            if dir.is_empty() {
                for original in &self.replacement_sources {
                    match names.iter().position(|name| Path::new(name) == original) {
                        Some(i) => {
                            names.remove(i);
                        }
                        None => {
                            return Err(SyncError::MissingReplacementSource {
                                file: original.clone(),
                                source_root: self.source.clone(),
                            })
                        }
                    }
                }
            }

            for name in names {
                let path = join_rel(&dir, &name);
                dest_files.remove(&path);
                let keys = self.matcher.keys_for(&path);
                if keys.is_empty() {
                    entries.push(TreeEntry::Copy { path });
                } else {
                    entries.push(TreeEntry::Substitute { path, keys });
                }
            }
        }

        entries.extend(dest_files.into_iter().map(|path| TreeEntry::RemoveFile { path }));
        entries.extend(dest_dirs.into_iter().rev().map(|path| TreeEntry::RemoveDir { path }));

        tracing::debug!(
            "reconciled {} against {}: {} entr(y/ies)",
            self.source.display(),
            self.destination.display(),
            entries.len()
        );
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
