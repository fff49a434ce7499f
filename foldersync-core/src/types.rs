//! Domain types for one sync cycle.
//!
//! Relative paths are `String`s normalized to forward slashes; roots are `PathBuf`.
//! Everything here is rebuilt from scratch on every cycle and never persisted.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncIssue;

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// What a path is, as seen without following symlinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    /// Raw link target as returned by `readlink`; never resolved.
    Symlink { target: PathBuf },
}

impl EntryKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink { .. } => "symlink",
        }
    }
}

/// A single scanned path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub relative_path: String,
    pub kind: EntryKind,
    pub modified: SystemTime,
    pub size: u64,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Every non-excluded entry under one root, keyed by relative path.
///
/// Ordered lexicographically, so a directory always precedes its descendants.
/// There is no mutating API: a new scan builds a new inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    root: PathBuf,
    entries: BTreeMap<String, FileEntry>,
}

impl Inventory {
    pub fn new(root: impl Into<PathBuf>, entries: impl IntoIterator<Item = FileEntry>) -> Self {
        Self {
            root: root.into(),
            entries: entries
                .into_iter()
                .map(|entry| (entry.relative_path.clone(), entry))
                .collect(),
        }
    }

    /// An inventory for a root that does not exist yet.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self::new(root, std::iter::empty())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, relative_path: &str) -> Option<&FileEntry> {
        self.entries.get(relative_path)
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.entries.contains_key(relative_path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Mode and plan
// ---------------------------------------------------------------------------

/// Direction policy for a pairwise sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Source → target only. Never pulls backward.
    OneWay,
    /// Per path, whichever side is newer wins.
    #[default]
    Bidirectional,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::OneWay => write!(f, "one-way"),
            SyncMode::Bidirectional => write!(f, "bidirectional"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "one-way" | "oneway" => Ok(SyncMode::OneWay),
            "bidirectional" | "two-way" => Ok(SyncMode::Bidirectional),
            other => Err(format!(
                "unknown sync mode '{other}'; expected: one-way, bidirectional"
            )),
        }
    }
}

/// One of the two roots of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// What the executor should do with one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanAction {
    CopySourceToTarget,
    CopyTargetToSource,
    /// Create the directory on the named side.
    CreateDir { on: Side },
    Skip,
}

impl PlanAction {
    /// Whether the action mutates either tree.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, PlanAction::Skip)
    }
}

/// Why the planner chose an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanReason {
    OnlyInSource,
    OnlyInTarget,
    SourceNewer,
    TargetNewer,
    /// Target-only path in one-way mode.
    OneWayTargetOnly,
    /// Target newer than source in one-way mode.
    OneWayTargetNewer,
    DirectoryMissing,
    InSync,
    /// A directory faces a non-directory at the same path.
    KindConflict,
}

impl fmt::Display for PlanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PlanReason::OnlyInSource => "new in source",
            PlanReason::OnlyInTarget => "new in target",
            PlanReason::SourceNewer => "source is newer",
            PlanReason::TargetNewer => "target is newer",
            PlanReason::OneWayTargetOnly => "only in target (one-way)",
            PlanReason::OneWayTargetNewer => "target is newer (one-way)",
            PlanReason::DirectoryMissing => "directory missing",
            PlanReason::InSync => "up to date",
            PlanReason::KindConflict => "directory conflicts with non-directory",
        };
        f.write_str(text)
    }
}

/// One planned step for one relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlanItem {
    pub relative_path: String,
    #[serde(flatten)]
    pub action: PlanAction,
    pub reason: PlanReason,
    /// The entry being propagated; `None` for skips.
    pub entry: Option<FileEntry>,
}

impl SyncPlanItem {
    pub fn skip(relative_path: impl Into<String>, reason: PlanReason) -> Self {
        Self {
            relative_path: relative_path.into(),
            action: PlanAction::Skip,
            reason,
            entry: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one pairwise cycle.
///
/// For a dry run the counts are what *would* have happened.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub copied: usize,
    pub dirs_created: usize,
    pub skipped: usize,
    pub errors: Vec<SyncIssue>,
    pub duration_ms: u128,
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
}

impl SyncResult {
    pub fn new(started_at: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            copied: 0,
            dirs_created: 0,
            skipped: 0,
            errors: Vec::new(),
            duration_ms: 0,
            started_at,
            dry_run,
        }
    }

    /// Number of copy or mkdir operations performed (or planned).
    pub fn changes(&self) -> usize {
        self.copied + self.dirs_created
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Per-unit outcome inside a bulk run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UnitStatus {
    Synced { result: SyncResult },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    #[serde(flatten)]
    pub status: UnitStatus,
}

/// Aggregate of a bulk run, units in name order.
#[derive(Debug, Clone, Serialize, Default)]
pub struct BulkSyncReport {
    pub units: Vec<UnitReport>,
    pub synced_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
}

impl BulkSyncReport {
    pub fn from_units(units: Vec<UnitReport>) -> Self {
        let mut report = Self {
            units,
            ..Self::default()
        };
        for unit in &report.units {
            match unit.status {
                UnitStatus::Synced { .. } => report.synced_count += 1,
                UnitStatus::Skipped { .. } => report.skipped_count += 1,
                UnitStatus::Failed { .. } => report.error_count += 1,
            }
        }
        report
    }

    /// Failed units or any per-item error inside a synced unit.
    pub fn has_errors(&self) -> bool {
        self.units.iter().any(|unit| match &unit.status {
            UnitStatus::Synced { result } => result.has_errors(),
            UnitStatus::Failed { .. } => true,
            UnitStatus::Skipped { .. } => false,
        })
    }

    pub fn unit(&self, name: &str) -> Option<&UnitReport> {
        self.units.iter().find(|unit| unit.name == name)
    }
}
