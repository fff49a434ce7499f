//! Diff two inventories into an ordered plan.
//!
//! Rules per relative path in the union of both inventories:
//! 1. Only in source → copy to target.
//! 2. Only in target → copy to source (bidirectional) or skip (one-way).
//! 3. Directory on one side only → create it on the other (never on the source in one-way).
//! 4. Directory against a non-directory → skip, the engine never deletes a tree.
//! 5. Identical symlink targets → skip.
//! 6. Otherwise the strictly newer side wins; ties within tolerance are skipped.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};

use foldersync_core::{
    EntryKind, FileEntry, Inventory, PlanAction, PlanReason, Side, SyncMode, SyncPlanItem,
};

/// Compares inventories under one mode and timestamp tolerance.
#[derive(Debug, Clone, Copy)]
pub struct DiffPlanner {
    pub mode: SyncMode,
    /// Modification times closer than this compare equal.
    pub mtime_tolerance: Duration,
}

impl DiffPlanner {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            mtime_tolerance: Duration::ZERO,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.mtime_tolerance = tolerance;
        self
    }

    /// One item per path, sorted by relative path so parents come first.
    pub fn plan(&self, source: &Inventory, target: &Inventory) -> Vec<SyncPlanItem> {
        let paths: BTreeSet<&str> = source.paths().chain(target.paths()).collect();
        paths
            .into_iter()
            .map(|path| self.plan_path(path, source.get(path), target.get(path)))
            .collect()
    }

    fn plan_path(
        &self,
        path: &str,
        source: Option<&FileEntry>,
        target: Option<&FileEntry>,
    ) -> SyncPlanItem {
        let one_way = self.mode == SyncMode::OneWay;
        match (source, target) {
            (Some(src), None) => propagate(path, src, Side::Source, PlanReason::OnlyInSource),
            (None, Some(_)) if one_way => SyncPlanItem::skip(path, PlanReason::OneWayTargetOnly),
            (None, Some(tgt)) => propagate(path, tgt, Side::Target, PlanReason::OnlyInTarget),
            (Some(src), Some(tgt)) => self.plan_both(path, src, tgt),
            (None, None) => SyncPlanItem::skip(path, PlanReason::InSync),
        }
    }

    fn plan_both(&self, path: &str, src: &FileEntry, tgt: &FileEntry) -> SyncPlanItem {
        match (&src.kind, &tgt.kind) {
            (EntryKind::Directory, EntryKind::Directory) => {
                return SyncPlanItem::skip(path, PlanReason::InSync);
            }
            (EntryKind::Directory, _) | (_, EntryKind::Directory) => {
                tracing::warn!(
                    "{path}: {} in source vs {} in target; leaving both untouched",
                    src.kind.label(),
                    tgt.kind.label()
                );
                return SyncPlanItem::skip(path, PlanReason::KindConflict);
            }
            (EntryKind::Symlink { target: a }, EntryKind::Symlink { target: b }) if a == b => {
                return SyncPlanItem::skip(path, PlanReason::InSync);
            }
            _ => {}
        }

        match compare_mtime(src.modified, tgt.modified, self.mtime_tolerance) {
            Ordering::Greater => propagate(path, src, Side::Source, PlanReason::SourceNewer),
            Ordering::Less if self.mode == SyncMode::OneWay => {
                SyncPlanItem::skip(path, PlanReason::OneWayTargetNewer)
            }
            Ordering::Less => propagate(path, tgt, Side::Target, PlanReason::TargetNewer),
            Ordering::Equal => SyncPlanItem::skip(path, PlanReason::InSync),
        }
    }
}

/// Plan `entry` (which lives on `from`) onto the other side.
fn propagate(path: &str, entry: &FileEntry, from: Side, reason: PlanReason) -> SyncPlanItem {
    let action = match (&entry.kind, from) {
        (EntryKind::Directory, Side::Source) => PlanAction::CreateDir { on: Side::Target },
        (EntryKind::Directory, Side::Target) => PlanAction::CreateDir { on: Side::Source },
        (_, Side::Source) => PlanAction::CopySourceToTarget,
        (_, Side::Target) => PlanAction::CopyTargetToSource,
    };
    let reason = if entry.kind.is_dir() {
        PlanReason::DirectoryMissing
    } else {
        reason
    };
    SyncPlanItem {
        relative_path: path.to_string(),
        action,
        reason,
        entry: Some(entry.clone()),
    }
}

/// `Greater` when `a` is newer than `b` by more than `tolerance`.
pub fn compare_mtime(a: SystemTime, b: SystemTime, tolerance: Duration) -> Ordering {
    let (ordering, delta) = match a.duration_since(b) {
        Ok(delta) => (Ordering::Greater, delta),
        Err(err) => (Ordering::Less, err.duration()),
    };
    if delta.is_zero() || delta <= tolerance {
        Ordering::Equal
    } else {
        ordering
    }
}

/// [`DiffPlanner::plan`] with exact timestamp comparison.
pub fn plan(source: &Inventory, target: &Inventory, mode: SyncMode) -> Vec<SyncPlanItem> {
    DiffPlanner::new(mode).plan(source, target)
}
