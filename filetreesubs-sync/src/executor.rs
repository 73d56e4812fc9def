//! Hash-gated task executor.
//!
//! ## Per-task protocol
//!
//! 1. Hash every file dependency (SHA-256).
//! 2. Compare hashes and config values with the stored record.
//! 3. Skip if identical and every target exists.
//! 4. Otherwise run the action (or report it under `--dry-run`).
//! 5. Update the record; the store is saved once the run ends.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;

use crate::actions::ActionContext;
use crate::error::SyncError;
use crate::state_store::{self, hash_file, StateStoreFile, TaskRecord};
use crate::tasks::{TaskCategory, TaskDescriptor, TaskGraph};

// ---------------------------------------------------------------------------
// Task outcome
// ---------------------------------------------------------------------------

/// What happened to a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The action ran.
    Executed { category: TaskCategory, name: String },
    /// Inputs match the stored record; nothing to do.
    UpToDate { category: TaskCategory, name: String },
    /// `--dry-run` mode: the action *would* have run.
    WouldExecute { category: TaskCategory, name: String },
}

impl TaskOutcome {
    pub fn category(&self) -> TaskCategory {
        match self {
            TaskOutcome::Executed { category, .. }
            | TaskOutcome::UpToDate { category, .. }
            | TaskOutcome::WouldExecute { category, .. } => *category,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TaskOutcome::Executed { name, .. }
            | TaskOutcome::UpToDate { name, .. }
            | TaskOutcome::WouldExecute { name, .. } => name,
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        matches!(self, TaskOutcome::UpToDate { .. })
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs a [`TaskGraph`] against the state store at `state_path`.
#[derive(Debug)]
pub struct Executor<'a> {
    actions: ActionContext<'a>,
    state_path: &'a Path,
    dry_run: bool,
}

impl<'a> Executor<'a> {
    pub fn new(actions: ActionContext<'a>, state_path: &'a Path, dry_run: bool) -> Self {
        Self {
            actions,
            state_path,
            dry_run,
        }
    }

    /// Execute every stale task in graph order.
    ///
    /// On failure the store is still saved, so tasks that completed keep
    /// their records, and the error is returned wrapped in
    /// [`SyncError::TaskFailed`].
    pub fn run(&self, graph: &TaskGraph) -> Result<Vec<TaskOutcome>, SyncError> {
        let started_at = Utc::now();
        let mut store = state_store::load_at(self.state_path)?;
        let mut outcomes = Vec::with_capacity(graph.len());

        for task in graph.tasks() {
            match self.run_task(task, &mut store) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    if !self.dry_run {
                        self.persist(graph, &mut store, started_at)?;
                    }
                    return Err(SyncError::TaskFailed {
                        task: task.id(),
                        source: Box::new(e),
                    });
                }
            }
        }

        if !self.dry_run {
            self.persist(graph, &mut store, started_at)?;
        }
        Ok(outcomes)
    }

    fn run_task(&self, task: &TaskDescriptor, store: &mut StateStoreFile) -> Result<TaskOutcome, SyncError> {
        let id = task.id();
        let record = fingerprint(task)?;
        let category = task.category;
        let name = task.name.clone();

        if !task.always_runs()
            && store.tasks.get(&id) == Some(&record)
            && task.targets.iter().all(|t| t.exists())
        {
            tracing::debug!("up to date: {id}");
            return Ok(TaskOutcome::UpToDate { category, name });
        }

        if self.dry_run {
            tracing::info!("[dry-run] would run: {id}");
            return Ok(TaskOutcome::WouldExecute { category, name });
        }

        self.actions.run(&task.action)?;
        if task.always_runs() {
            store.tasks.remove(&id);
        } else {
            store.tasks.insert(id, record);
        }
        Ok(TaskOutcome::Executed { category, name })
    }

    fn persist(
        &self,
        graph: &TaskGraph,
        store: &mut StateStoreFile,
        started_at: chrono::DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let live: BTreeSet<String> = graph.tasks().iter().map(TaskDescriptor::id).collect();
        store.tasks.retain(|id, _| live.contains(id));
        store.synced_at = started_at;
        state_store::save_at(self.state_path, store)
    }
}

/// Current hashes of `task`'s file dependencies plus its config values.
fn fingerprint(task: &TaskDescriptor) -> Result<TaskRecord, SyncError> {
    let mut record = TaskRecord {
        values: task.config_values.clone(),
        ..TaskRecord::default()
    };
    for dep in &task.file_deps {
        record
            .deps
            .insert(dep.to_string_lossy().into_owned(), hash_file(dep)?);
    }
    Ok(record)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::TreeEntry;
    use crate::replacements::ReplacementRegistry;
    use crate::tasks::TaskGraphBuilder;
    use filetreesubs_core::Config;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        config: Config,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("input");
        let destination = tmp.path().join("output");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&destination).unwrap();
        fs::write(source.join("a.txt"), "alpha").unwrap();
        let config = Config {
            source,
            destination,
            create_index_content: "<p>index</p>".to_string(),
            state_file: tmp.path().join("state.json"),
            ..Config::default()
        };
        Fixture { _tmp: tmp, config }
    }

    fn entries() -> Vec<TreeEntry> {
        vec![
            TreeEntry::Copy {
                path: "a.txt".to_string(),
            },
            TreeEntry::CreateIndex {
                path: "index.html".to_string(),
            },
        ]
    }

    fn run(config: &Config, entries: &[TreeEntry], dry_run: bool) -> Result<Vec<TaskOutcome>, SyncError> {
        let registry = ReplacementRegistry::from_config(config).unwrap();
        let graph = TaskGraphBuilder::new(config, &registry).build(entries).unwrap();
        let actions = ActionContext::new(config, &registry);
        Executor::new(actions, &config.state_file, dry_run).run(&graph)
    }

    fn executed(outcomes: &[TaskOutcome]) -> Vec<TaskCategory> {
        outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::Executed { .. }))
            .map(TaskOutcome::category)
            .collect()
    }

    #[test]
    fn first_run_executes_second_is_up_to_date() {
        let fx = fixture();
        let first = run(&fx.config, &entries(), false).unwrap();
        assert_eq!(executed(&first), vec![TaskCategory::Copy, TaskCategory::CreateIndex]);
        assert_eq!(
            fs::read_to_string(fx.config.destination.join("a.txt")).unwrap(),
            "alpha"
        );

        let second = run(&fx.config, &entries(), false).unwrap();
        assert!(second.iter().all(TaskOutcome::is_up_to_date), "{second:?}");
    }

    #[test]
    fn changed_dependency_reruns_only_that_task() {
        let fx = fixture();
        run(&fx.config, &entries(), false).unwrap();
        fs::write(fx.config.source.join("a.txt"), "beta").unwrap();

        let outcomes = run(&fx.config, &entries(), false).unwrap();
        assert_eq!(executed(&outcomes), vec![TaskCategory::Copy]);
        assert_eq!(
            fs::read_to_string(fx.config.destination.join("a.txt")).unwrap(),
            "beta"
        );
    }

    #[test]
    fn changed_index_content_reruns_only_create_index() {
        let mut fx = fixture();
        run(&fx.config, &entries(), false).unwrap();
        fx.config.create_index_content = "<p>new</p>".to_string();

        let outcomes = run(&fx.config, &entries(), false).unwrap();
        assert_eq!(executed(&outcomes), vec![TaskCategory::CreateIndex]);
        assert_eq!(
            fs::read_to_string(fx.config.destination.join("index.html")).unwrap(),
            "<p>new</p>"
        );
    }

    #[test]
    fn missing_target_is_rebuilt() {
        let fx = fixture();
        run(&fx.config, &entries(), false).unwrap();
        fs::remove_file(fx.config.destination.join("a.txt")).unwrap();

        let outcomes = run(&fx.config, &entries(), false).unwrap();
        assert_eq!(executed(&outcomes), vec![TaskCategory::Copy]);
    }

    #[test]
    fn touching_mtime_alone_is_a_noop() {
        let fx = fixture();
        run(&fx.config, &entries(), false).unwrap();
        let later = filetime::FileTime::from_unix_time(2_000_000_000, 0);
        filetime::set_file_mtime(fx.config.source.join("a.txt"), later).unwrap();

        let outcomes = run(&fx.config, &entries(), false).unwrap();
        assert!(outcomes.iter().all(TaskOutcome::is_up_to_date));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let fx = fixture();
        let outcomes = run(&fx.config, &entries(), true).unwrap();
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, TaskOutcome::WouldExecute { .. })));
        assert!(!fx.config.destination.join("a.txt").exists());
        assert!(!fx.config.state_file.exists(), "dry-run must not save state");
    }

    #[test]
    fn removals_always_run_and_leave_no_record() {
        let fx = fixture();
        fs::write(fx.config.destination.join("stale.txt"), "x").unwrap();
        let removal = vec![TreeEntry::RemoveFile {
            path: "stale.txt".to_string(),
        }];

        let outcomes = run(&fx.config, &removal, false).unwrap();
        assert_eq!(executed(&outcomes), vec![TaskCategory::Remove]);
        assert!(!fx.config.destination.join("stale.txt").exists());

        let store = state_store::load_at(&fx.config.state_file).unwrap();
        assert!(store.tasks.is_empty());

        // A second run still executes the (now failing) removal.
        let outcomes = run(&fx.config, &removal, false).unwrap();
        assert_eq!(executed(&outcomes), vec![TaskCategory::Remove]);
    }

    #[test]
    fn records_of_vanished_tasks_are_pruned() {
        let fx = fixture();
        run(&fx.config, &entries(), false).unwrap();
        run(&fx.config, &entries()[1..], false).unwrap();

        let store = state_store::load_at(&fx.config.state_file).unwrap();
        let ids: BTreeSet<&str> = store.tasks.keys().map(String::as_str).collect();
        assert_eq!(ids.len(), 1);
        assert!(ids.iter().all(|id| id.starts_with("create_index:")));
    }

    #[test]
    fn failure_keeps_records_of_completed_tasks() {
        let fx = fixture();
        let mut with_missing = entries();
        with_missing.insert(
            1,
            TreeEntry::Copy {
                path: "missing.txt".to_string(),
            },
        );

        let err = run(&fx.config, &with_missing, false).unwrap_err();
        match &err {
            SyncError::TaskFailed { task, source } => {
                assert!(task.starts_with("copy:"), "task: {task}");
                assert!(task.ends_with("missing.txt"), "task: {task}");
                assert!(matches!(**source, SyncError::Io { .. }));
            }
            other => panic!("expected TaskFailed, got {other:?}"),
        }

        let store = state_store::load_at(&fx.config.state_file).unwrap();
        assert_eq!(store.tasks.len(), 1, "only a.txt completed");
    }
}
