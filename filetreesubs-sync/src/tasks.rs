//! Task graph: declarative task descriptors built from tree entries.
//!
//! Each task declares the files its action reads (`file_deps`), the files it
//! writes (`targets`) and the configuration values its output depends on
//! (`config_values`: output encoding, index content, digests of resolved
//! replacement content). The executor uses exactly
//! these declarations to decide whether a task is up to date.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use filetreesubs_core::Config;

use crate::error::SyncError;
use crate::paths::under;
use crate::reconcile::TreeEntry;
use crate::replacements::ReplacementRegistry;
use crate::state_store::hash_text;

/// Task category, used for filtering and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskCategory {
    Copy,
    Subs,
    Remove,
    CreateIndex,
}

impl TaskCategory {
    pub fn all() -> &'static [TaskCategory] {
        &[
            TaskCategory::Subs,
            TaskCategory::Copy,
            TaskCategory::Remove,
            TaskCategory::CreateIndex,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Copy => "copy",
            TaskCategory::Subs => "subs",
            TaskCategory::Remove => "remove",
            TaskCategory::CreateIndex => "create_index",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The concrete operation a task performs, with resolved paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    Copy { src: PathBuf, dst: PathBuf },
    Substitute { src: PathBuf, dst: PathBuf, keys: Vec<String> },
    CreateIndex { dst: PathBuf },
    RemoveFile { path: PathBuf },
    RemoveDir { path: PathBuf },
}

/// One unit of work. Never mutated after emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub category: TaskCategory,
    /// Destination path, as displayed.
    pub name: String,
    pub file_deps: Vec<PathBuf>,
    pub targets: Vec<PathBuf>,
    pub action: TaskAction,
    /// Configuration the output depends on beyond `file_deps`.
    pub config_values: BTreeMap<String, String>,
}

impl TaskDescriptor {
    /// Stable identifier: `<category>:<name>`.
    pub fn id(&self) -> String {
        format!("{}:{}", self.category, self.name)
    }

    /// Tasks with no declared inputs run every time.
    pub fn always_runs(&self) -> bool {
        self.file_deps.is_empty() && self.config_values.is_empty()
    }
}

/// Ordered, immutable list of tasks for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskGraph {
    tasks: Vec<TaskDescriptor>,
}

impl TaskGraph {
    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn by_category(&self, category: TaskCategory) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.iter().filter(move |t| t.category == category)
    }

    /// Number of tasks per category (categories without tasks are omitted).
    pub fn counts(&self) -> BTreeMap<TaskCategory, usize> {
        let mut counts = BTreeMap::new();
        for task in &self.tasks {
            *counts.entry(task.category).or_insert(0) += 1;
        }
        counts
    }
}

/// Turns [`TreeEntry`] classifications into a [`TaskGraph`].
#[derive(Debug)]
pub struct TaskGraphBuilder<'a> {
    source: &'a Path,
    destination: &'a Path,
    index_content: &'a str,
    registry: &'a ReplacementRegistry,
}

impl<'a> TaskGraphBuilder<'a> {
    pub fn new(config: &'a Config, registry: &'a ReplacementRegistry) -> Self {
        Self {
            source: &config.source,
            destination: &config.destination,
            index_content: &config.create_index_content,
            registry,
        }
    }

    /// Emit one task per entry, in entry order.
    ///
    /// Fails with [`SyncError::DuplicateOutput`] if two tasks target the same path.
    pub fn build(&self, entries: &[TreeEntry]) -> Result<TaskGraph, SyncError> {
        let mut tasks = Vec::with_capacity(entries.len());
        let mut targets = BTreeSet::new();
        for entry in entries {
            let task = self.task_for(entry)?;
            for target in &task.targets {
                if !targets.insert(target.clone()) {
                    return Err(SyncError::DuplicateOutput {
                        path: target.clone(),
                    });
                }
            }
            tasks.push(task);
        }
        Ok(TaskGraph { tasks })
    }

    /// Output encoding, part of every task that writes text.
    fn encoding_value(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(
            "encoding".to_string(),
            self.registry.encoding().name().to_string(),
        )])
    }

    fn task_for(&self, entry: &TreeEntry) -> Result<TaskDescriptor, SyncError> {
        let dst = under(self.destination, entry.path());
        let name = dst.display().to_string();
        let task = match entry {
            TreeEntry::Copy { path } => {
                let src = under(self.source, path);
                TaskDescriptor {
                    category: TaskCategory::Copy,
                    name,
                    file_deps: vec![src.clone()],
                    targets: vec![dst.clone()],
                    action: TaskAction::Copy { src, dst },
                    config_values: BTreeMap::new(),
                }
            }
            TreeEntry::Substitute { path, keys } => {
                let src = under(self.source, path);
                let mut file_deps = vec![src.clone()];
                let mut config_values = self.encoding_value();
                for key in keys {
                    let unknown = || SyncError::UnknownKey { key: key.clone() };
                    let deps = self.registry.dependencies(key).ok_or_else(unknown)?;
                    for dep in deps {
                        if !file_deps.contains(dep) {
                            file_deps.push(dep.clone());
                        }
                    }
                    let content = self.registry.content(key).ok_or_else(unknown)?;
                    config_values.insert(format!("key:{key}"), hash_text(content));
                }
                TaskDescriptor {
                    category: TaskCategory::Subs,
                    name,
                    file_deps,
                    targets: vec![dst.clone()],
                    action: TaskAction::Substitute {
                        src,
                        dst,
                        keys: keys.iter().cloned().collect(),
                    },
                    config_values,
                }
            }
            TreeEntry::CreateIndex { .. } => TaskDescriptor {
                category: TaskCategory::CreateIndex,
                name,
                file_deps: vec![],
                targets: vec![dst.clone()],
                action: TaskAction::CreateIndex { dst },
                config_values: {
                    let mut values = self.encoding_value();
                    values.insert("content".to_string(), self.index_content.to_string());
                    values
                },
            },
            TreeEntry::RemoveFile { .. } => TaskDescriptor {
                category: TaskCategory::Remove,
                name,
                file_deps: vec![],
                targets: vec![],
                action: TaskAction::RemoveFile { path: dst },
                config_values: BTreeMap::new(),
            },
            TreeEntry::RemoveDir { .. } => TaskDescriptor {
                category: TaskCategory::Remove,
                name,
                file_deps: vec![],
                targets: vec![],
                action: TaskAction::RemoveDir { path: dst },
                config_values: BTreeMap::new(),
            },
        };
        Ok(task)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use filetreesubs_core::{ReplacementDefinition, ReplacementKey};
    use std::fs;
    use tempfile::TempDir;

    fn keys(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn config() -> Config {
        Config {
            source: PathBuf::from("input"),
            destination: PathBuf::from("output"),
            create_index_content: "<html></html>".into(),
            ..Config::default()
        }
    }

    #[test]
    fn copy_task_reads_source_and_writes_destination() {
        let config = config();
        let registry = ReplacementRegistry::new("input", encoding_rs::UTF_8);
        let graph = TaskGraphBuilder::new(&config, &registry)
            .build(&[TreeEntry::Copy { path: "css/site.css".into() }])
            .unwrap();

        let task = &graph.tasks()[0];
        assert_eq!(task.category, TaskCategory::Copy);
        assert_eq!(task.name, under(Path::new("output"), "css/site.css").display().to_string());
        assert_eq!(task.file_deps, vec![under(Path::new("input"), "css/site.css")]);
        assert_eq!(task.targets, vec![under(Path::new("output"), "css/site.css")]);
        assert!(task.id().starts_with("copy:"));
    }

    #[test]
    fn substitute_task_depends_on_every_key_source() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("header.html"), "h").unwrap();
        fs::write(src.path().join("footer.html"), "f").unwrap();
        let config = Config {
            source: src.path().to_path_buf(),
            ..config()
        };
        let mut registry = ReplacementRegistry::new(src.path(), encoding_rs::UTF_8);
        for (key, file) in [("HEADER", "header.html"), ("FOOTER", "footer.html")] {
            registry
                .register(
                    &ReplacementKey::from(key),
                    &ReplacementDefinition::File(PathBuf::from(file)),
                )
                .unwrap();
        }
        registry
            .register(&ReplacementKey::from("TITLE"), &ReplacementDefinition::Text("T".into()))
            .unwrap();

        let graph = TaskGraphBuilder::new(&config, &registry)
            .build(&[TreeEntry::Substitute {
                path: "index.html".into(),
                keys: keys(&["TITLE", "HEADER", "FOOTER"]),
            }])
            .unwrap();

        let task = &graph.tasks()[0];
        assert_eq!(task.category, TaskCategory::Subs);
        assert_eq!(
            task.file_deps,
            vec![
                src.path().join("index.html"),
                src.path().join("footer.html"),
                src.path().join("header.html"),
            ]
        );
        match &task.action {
            TaskAction::Substitute { keys, .. } => assert_eq!(keys, &["FOOTER", "HEADER", "TITLE"]),
            other => panic!("expected substitute action, got {other:?}"),
        }
    }

    #[test]
    fn substitute_task_is_keyed_on_resolved_content_and_encoding() {
        let config = config();
        let mut registry = ReplacementRegistry::new("input", encoding_rs::UTF_8);
        registry
            .register(&ReplacementKey::from("TITLE"), &ReplacementDefinition::Text("Foo".into()))
            .unwrap();
        let entry = TreeEntry::Substitute {
            path: "index.html".into(),
            keys: keys(&["TITLE"]),
        };

        let graph = TaskGraphBuilder::new(&config, &registry).build(&[entry.clone()]).unwrap();
        let values = &graph.tasks()[0].config_values;
        assert_eq!(values.get("encoding").map(String::as_str), Some("UTF-8"));
        assert_eq!(values.get("key:TITLE"), Some(&hash_text("Foo")));

        let mut other = ReplacementRegistry::new("input", encoding_rs::UTF_8);
        other
            .register(&ReplacementKey::from("TITLE"), &ReplacementDefinition::Text("Bar".into()))
            .unwrap();
        let changed = TaskGraphBuilder::new(&config, &other).build(&[entry]).unwrap();
        assert_ne!(changed.tasks()[0].config_values, *values);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let config = config();
        let registry = ReplacementRegistry::new("input", encoding_rs::UTF_8);
        let err = TaskGraphBuilder::new(&config, &registry)
            .build(&[TreeEntry::Substitute {
                path: "a.html".into(),
                keys: keys(&["MISSING"]),
            }])
            .unwrap_err();
        assert!(matches!(err, SyncError::UnknownKey { .. }), "got: {err}");
    }

    #[test]
    fn create_index_is_keyed_on_content() {
        let config = config();
        let registry = ReplacementRegistry::new("input", encoding_rs::UTF_8);
        let graph = TaskGraphBuilder::new(&config, &registry)
            .build(&[TreeEntry::CreateIndex { path: "sub/index.html".into() }])
            .unwrap();

        let task = &graph.tasks()[0];
        assert!(task.file_deps.is_empty());
        assert_eq!(task.config_values.get("content").map(String::as_str), Some("<html></html>"));
        assert_eq!(task.config_values.get("encoding").map(String::as_str), Some("UTF-8"));
        assert!(!task.always_runs());
    }

    #[test]
    fn remove_tasks_have_no_inputs_or_outputs() {
        let config = config();
        let registry = ReplacementRegistry::new("input", encoding_rs::UTF_8);
        let graph = TaskGraphBuilder::new(&config, &registry)
            .build(&[
                TreeEntry::RemoveFile { path: "old/stale.txt".into() },
                TreeEntry::RemoveDir { path: "old".into() },
            ])
            .unwrap();

        assert_eq!(graph.counts(), BTreeMap::from([(TaskCategory::Remove, 2)]));
        for task in graph.tasks() {
            assert!(task.always_runs());
            assert!(task.targets.is_empty());
        }
        assert!(matches!(graph.tasks()[1].action, TaskAction::RemoveDir { .. }));
    }

    #[test]
    fn duplicate_targets_are_rejected() {
        let config = config();
        let registry = ReplacementRegistry::new("input", encoding_rs::UTF_8);
        let err = TaskGraphBuilder::new(&config, &registry)
            .build(&[
                TreeEntry::Copy { path: "index.html".into() },
                TreeEntry::CreateIndex { path: "index.html".into() },
            ])
            .unwrap_err();
        assert!(matches!(err, SyncError::DuplicateOutput { .. }), "got: {err}");
    }

    #[test]
    fn category_names_are_stable() {
        let names: Vec<_> = TaskCategory::all().iter().map(TaskCategory::as_str).collect();
        assert_eq!(names, vec!["subs", "copy", "remove", "create_index"]);
    }
}
