//! # foldersync-sync
//!
//! Planning and applying directory synchronization.
//!
//! - [`planner`] diffs two inventories into an ordered plan.
//! - [`executor`] applies a plan with atomic, mtime-preserving copies.
//! - [`pipeline`] runs Scan → Diff → Apply for one validated pair.
//! - [`bulk`] runs the pipeline for every unit under a source root.

pub mod bulk;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod planner;

pub use bulk::{discover_units, sync_all, BulkOptions};
pub use error::SyncError;
pub use executor::{apply, ApplyOutcome, SyncExecutor};
pub use pipeline::{run_once, run_once_with, PairConfig, Phase, SyncRun};
pub use planner::{plan, DiffPlanner};
