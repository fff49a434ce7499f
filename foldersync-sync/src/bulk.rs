//! Fan the pairwise cycle out over every unit directory of a source root.
//!
//! A unit is an immediate subdirectory of the source root. Each unit is
//! synced against the directory of the same name under the target root and
//! fails on its own without affecting its siblings.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use foldersync_core::settings::DEFAULT_BULK_WORKERS;
use foldersync_core::{
    BulkSyncReport, ConfigError, ExclusionMatcher, SyncMode, UnitReport, UnitStatus,
};

use crate::error::io_err;
use crate::pipeline::{check_overlap, run_once, validate_root, PairConfig};
use crate::SyncError;

/// Marker file that makes an otherwise empty directory a unit.
pub const UNIT_MARKER: &str = "SKILL.md";

#[derive(Debug, Clone)]
pub struct BulkOptions {
    pub mode: SyncMode,
    /// Leave a unit alone when its target entry is a symlink.
    pub skip_symlinks: bool,
    pub dry_run: bool,
    pub extra_excludes: Vec<String>,
    /// Units synced concurrently; `0` is treated as `1`.
    pub workers: usize,
    pub mtime_tolerance: Duration,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::OneWay,
            skip_symlinks: true,
            dry_run: false,
            extra_excludes: Vec::new(),
            workers: DEFAULT_BULK_WORKERS,
            mtime_tolerance: Duration::ZERO,
        }
    }
}

/// Sync every unit under `source_root` into `target_root`.
///
/// Only invalid roots or options are returned as errors; everything that
/// goes wrong inside a unit is reported in that unit's [`UnitStatus`].
/// Both roots must already exist. The roots may nest (a source root inside
/// the target root is the usual install layout); overlap is checked per unit.
pub fn sync_all(
    source_root: &Path,
    target_root: &Path,
    options: &BulkOptions,
) -> Result<BulkSyncReport, SyncError> {
    let matcher = ExclusionMatcher::new(&options.extra_excludes)?;
    let source_root = validate_root("source", source_root, options.mode == SyncMode::Bidirectional)?;
    let target_root = validate_root("target", target_root, !options.dry_run)?;

    let units = discover_units(&source_root, &matcher)?;
    tracing::info!(
        "bulk sync {} → {}: {} units ({}{})",
        source_root.display(),
        target_root.display(),
        units.len(),
        options.mode,
        if options.dry_run { ", dry run" } else { "" }
    );

    let job = UnitJob {
        source_root: &source_root,
        target_root: &target_root,
        matcher: &matcher,
        options,
    };
    let reports = run_bounded(&units, options.workers, |name| job.sync_unit(name));
    Ok(BulkSyncReport::from_units(reports))
}

/// Unit names in name order.
///
/// Hidden and excluded directories are never units. A unit must contain
/// [`UNIT_MARKER`] or at least one entry.
pub fn discover_units(
    source_root: &Path,
    matcher: &ExclusionMatcher,
) -> Result<Vec<String>, SyncError> {
    let listing = std::fs::read_dir(source_root).map_err(|e| io_err(source_root, e))?;
    let mut units = Vec::new();
    for entry in listing {
        let entry = entry.map_err(|e| io_err(source_root, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!("skipping unit with non UTF-8 name: {}", path.display());
            continue;
        };
        if name.starts_with('.') || matcher.should_exclude(&name, true) {
            continue;
        }
        if !is_unit(&path) {
            tracing::debug!("skipping empty directory {}", path.display());
            continue;
        }
        units.push(name);
    }
    units.sort();
    Ok(units)
}

fn is_unit(path: &Path) -> bool {
    if path.join(UNIT_MARKER).is_file() {
        return true;
    }
    std::fs::read_dir(path)
        .map(|mut listing| listing.next().is_some())
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Per-unit work
// ---------------------------------------------------------------------------

struct UnitJob<'a> {
    source_root: &'a Path,
    target_root: &'a Path,
    matcher: &'a ExclusionMatcher,
    options: &'a BulkOptions,
}

impl UnitJob<'_> {
    fn sync_unit(&self, name: &str) -> UnitReport {
        let status = self.unit_status(name);
        match &status {
            UnitStatus::Synced { result } => tracing::info!(
                "{name}: {} copied, {} dirs, {} skipped, {} errors",
                result.copied,
                result.dirs_created,
                result.skipped,
                result.errors.len()
            ),
            UnitStatus::Skipped { reason } => tracing::info!("{name}: skipped ({reason})"),
            UnitStatus::Failed { error } => tracing::error!("{name}: {error}"),
        }
        UnitReport {
            name: name.to_string(),
            status,
        }
    }

    fn unit_status(&self, name: &str) -> UnitStatus {
        let source = self.source_root.join(name);
        let target = self.target_root.join(name);

        match std::fs::symlink_metadata(&target) {
            Ok(meta) if meta.file_type().is_symlink() && self.options.skip_symlinks => {
                return UnitStatus::Skipped {
                    reason: "target is a symlink".to_string(),
                };
            }
            Ok(meta) if !meta.file_type().is_symlink() && !meta.is_dir() => {
                return UnitStatus::Failed {
                    error: ConfigError::NotADirectory {
                        side: "target",
                        path: target,
                    }
                    .to_string(),
                };
            }
            _ => {}
        }

        if let Err(err) = check_overlap(&source, &target) {
            return UnitStatus::Failed {
                error: err.to_string(),
            };
        }

        if !self.options.dry_run {
            if let Err(err) = std::fs::create_dir_all(&target) {
                return UnitStatus::Failed {
                    error: io_err(&target, err).to_string(),
                };
            }
        }

        let config = PairConfig::unit(
            source,
            target,
            self.options.mode,
            self.matcher.clone(),
            self.options.mtime_tolerance,
        );
        match run_once(&config, self.options.dry_run) {
            Ok(run) => UnitStatus::Synced { result: run.result },
            Err(err) => UnitStatus::Failed {
                error: err.to_string(),
            },
        }
    }
}

/// Map `items` through `work` on at most `workers` threads, keeping input order.
fn run_bounded<T, R, F>(items: &[T], workers: usize, work: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = workers.clamp(1, items.len().max(1));
    if workers == 1 {
        return items.iter().map(&work).collect();
    }

    let next = AtomicUsize::new(0);
    let done = Mutex::new(Vec::with_capacity(items.len()));
    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(index) else {
                    break;
                };
                let output = work(item);
                if let Ok(mut done) = done.lock() {
                    done.push((index, output));
                }
            });
        }
    });

    let mut done = done.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
    done.sort_by_key(|(index, _)| *index);
    done.into_iter().map(|(_, output)| output).collect()
}
