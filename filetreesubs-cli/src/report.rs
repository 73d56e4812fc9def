//! Human-readable run summary.

use filetreesubs_sync::{RunResult, TaskOutcome};

/// One line per task that ran (or would run), then a summary line.
pub fn print_results(result: &RunResult, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };

    for outcome in &result.outcomes {
        match outcome {
            TaskOutcome::Executed { category, name } => println!("{category}  {name}"),
            TaskOutcome::WouldExecute { category, name } => {
                println!("{prefix}{category}  {name}")
            }
            TaskOutcome::UpToDate { .. } => {}
        }
    }

    let verb = if dry_run { "would run" } else { "executed" };
    println!(
        "{prefix}✓ {} task(s) {verb}, {} up to date",
        result.executed(),
        result.up_to_date()
    );
}
