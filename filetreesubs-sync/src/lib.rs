//! # filetreesubs-sync
//!
//! Reconciles a destination tree with a source tree, applying configured
//! text substitutions on the way.
//!
//! Call [`pipeline::run`] with a loaded [`filetreesubs_core::Config`]. The
//! pipeline resolves the [`ReplacementRegistry`], classifies every path with
//! the [`TreeReconciler`], turns the result into a [`TaskGraph`] and runs the
//! stale tasks through the hash-gated [`Executor`].

pub mod actions;
pub mod error;
pub mod executor;
pub mod paths;
pub mod pipeline;
pub mod reconcile;
pub mod replacements;
pub mod state_store;
pub mod substitute;
pub mod tasks;

pub use error::SyncError;
pub use executor::{Executor, TaskOutcome};
pub use pipeline::RunResult;
pub use reconcile::{TreeEntry, TreeReconciler};
pub use replacements::ReplacementRegistry;
pub use substitute::substitute;
pub use tasks::{TaskCategory, TaskGraph, TaskGraphBuilder};
