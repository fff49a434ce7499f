//! foldersync core library: data model, exclusion, scanning, settings.
//!
//! - [`types`]: entries, inventories, plans, results
//! - [`error`]: [`ConfigError`], [`ScanError`], [`CopyError`], [`SyncIssue`]
//! - [`exclude`]: [`ExclusionMatcher`]
//! - [`scanner`]: [`scan`] a root into an [`Inventory`]
//! - [`settings`]: `~/.foldersync/settings.yaml`

pub mod error;
pub mod exclude;
pub mod scanner;
pub mod settings;
pub mod types;

pub use error::{ConfigError, CopyError, ScanError, SyncIssue};
pub use exclude::{ExclusionMatcher, DEFAULT_EXCLUDES};
pub use scanner::{scan, Scan};
pub use settings::Settings;
pub use types::{
    BulkSyncReport, EntryKind, FileEntry, Inventory, PlanAction, PlanReason, Side, SyncMode,
    SyncPlanItem, SyncResult, UnitReport, UnitStatus,
};
