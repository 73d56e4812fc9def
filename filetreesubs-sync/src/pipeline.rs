//! Sync pipeline entrypoint used by the CLI.
//!
//! registry → reconciler → task graph → executor, built fresh for every run.

use filetreesubs_core::Config;

use crate::actions::ActionContext;
use crate::error::SyncError;
use crate::executor::{Executor, TaskOutcome};
use crate::reconcile::TreeReconciler;
use crate::replacements::ReplacementRegistry;
use crate::tasks::{TaskGraph, TaskGraphBuilder};

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct RunResult {
    pub graph: TaskGraph,
    pub outcomes: Vec<TaskOutcome>,
}

impl RunResult {
    /// Number of tasks that ran (or would run under `--dry-run`).
    pub fn executed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_up_to_date()).count()
    }

    pub fn up_to_date(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_up_to_date()).count()
    }
}

/// Plan the task graph for `config` without executing anything.
pub fn plan(config: &Config) -> Result<(ReplacementRegistry, TaskGraph), SyncError> {
    let registry = ReplacementRegistry::from_config(config)?;
    let entries = TreeReconciler::from_config(config, &registry)?.reconcile()?;
    let graph = TaskGraphBuilder::new(config, &registry).build(&entries)?;
    tracing::debug!("planned {} task(s)", graph.len());
    Ok((registry, graph))
}

/// Reconcile `config.destination` with `config.source`.
pub fn run(config: &Config, dry_run: bool) -> Result<RunResult, SyncError> {
    let (registry, graph) = plan(config)?;
    let actions = ActionContext::new(config, &registry);
    let outcomes = Executor::new(actions, &config.state_file, dry_run).run(&graph)?;
    Ok(RunResult { graph, outcomes })
}
