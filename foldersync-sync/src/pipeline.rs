//! Scan → Diff → Apply for one source/target pair.
//!
//! This is the canonical cycle behind `foldersync sync`, every watch tick and
//! every bulk unit.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;

use foldersync_core::{
    scan, ConfigError, ExclusionMatcher, PlanAction, Side, SyncMode, SyncPlanItem, SyncResult,
};

use crate::executor::SyncExecutor;
use crate::planner::DiffPlanner;
use crate::SyncError;

/// A validated pair of roots plus the options of one cycle.
#[derive(Debug, Clone)]
pub struct PairConfig {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub mode: SyncMode,
    pub matcher: ExclusionMatcher,
    pub mtime_tolerance: Duration,
    allow_missing_target: bool,
}

impl PairConfig {
    /// Validate both roots and compile the exclusion set.
    ///
    /// Both roots must be existing, readable directories that do not contain
    /// one another. The target (and the source, when bidirectional) must be
    /// writable. Roots are stored canonicalized.
    pub fn new<S: AsRef<str>>(
        source_root: &Path,
        target_root: &Path,
        mode: SyncMode,
        extra_excludes: &[S],
    ) -> Result<Self, ConfigError> {
        let matcher = ExclusionMatcher::new(extra_excludes)?;
        let source_root = validate_root("source", source_root, mode == SyncMode::Bidirectional)?;
        let target_root = validate_root("target", target_root, true)?;
        check_overlap(&source_root, &target_root)?;

        Ok(Self {
            source_root,
            target_root,
            mode,
            matcher,
            mtime_tolerance: Duration::ZERO,
            allow_missing_target: false,
        })
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.mtime_tolerance = tolerance;
        self
    }

    /// Pair for one bulk unit; the orchestrator has already checked the parents.
    pub(crate) fn unit(
        source_root: PathBuf,
        target_root: PathBuf,
        mode: SyncMode,
        matcher: ExclusionMatcher,
        mtime_tolerance: Duration,
    ) -> Self {
        Self {
            source_root,
            target_root,
            mode,
            matcher,
            mtime_tolerance,
            allow_missing_target: true,
        }
    }

    /// Re-check that the roots are still there. Cheap; runs before every cycle.
    pub fn check_roots(&self) -> Result<(), ConfigError> {
        ensure_dir("source", &self.source_root)?;
        if self.allow_missing_target && !self.target_root.exists() {
            return Ok(());
        }
        ensure_dir("target", &self.target_root)
    }
}

/// Plan and outcome of one cycle.
#[derive(Debug, Clone)]
pub struct SyncRun {
    pub plan: Vec<SyncPlanItem>,
    pub result: SyncResult,
}

/// Step of a cycle, reported through [`run_once_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scanning,
    Diffing,
    Applying,
}

/// Run one cycle. A dry run stops after planning and reports planned counts.
///
/// Scan errors of both sides are merged into `result.errors` ahead of any
/// copy errors.
pub fn run_once(config: &PairConfig, dry_run: bool) -> Result<SyncRun, SyncError> {
    run_once_with(config, dry_run, |_| {})
}

/// [`run_once`], calling `on_phase` as each step begins.
pub fn run_once_with(
    config: &PairConfig,
    dry_run: bool,
    mut on_phase: impl FnMut(Phase),
) -> Result<SyncRun, SyncError> {
    config.check_roots()?;
    let started_at = Utc::now();
    let started = Instant::now();

    on_phase(Phase::Scanning);
    let source = scan(&config.source_root, Side::Source, &config.matcher);
    let target = scan(&config.target_root, Side::Target, &config.matcher);

    on_phase(Phase::Diffing);
    let plan = DiffPlanner::new(config.mode)
        .with_tolerance(config.mtime_tolerance)
        .plan(&source.inventory, &target.inventory);

    let mut result = if dry_run {
        planned_result(&plan, started_at)
    } else {
        on_phase(Phase::Applying);
        SyncExecutor::new(&config.source_root, &config.target_root).apply(&plan)
    };
    result.started_at = started_at;

    let mut errors: Vec<_> = source
        .errors
        .into_iter()
        .chain(target.errors)
        .map(Into::into)
        .collect();
    errors.append(&mut result.errors);
    result.errors = errors;
    result.duration_ms = started.elapsed().as_millis();

    tracing::debug!(
        "{} → {} ({}): {} copied, {} dirs, {} skipped, {} errors{}",
        config.source_root.display(),
        config.target_root.display(),
        config.mode,
        result.copied,
        result.dirs_created,
        result.skipped,
        result.errors.len(),
        if dry_run { " (dry run)" } else { "" }
    );

    Ok(SyncRun { plan, result })
}

fn planned_result(plan: &[SyncPlanItem], started_at: chrono::DateTime<Utc>) -> SyncResult {
    let mut result = SyncResult::new(started_at, true);
    for item in plan {
        match item.action {
            PlanAction::Skip => result.skipped += 1,
            PlanAction::CreateDir { .. } => result.dirs_created += 1,
            PlanAction::CopySourceToTarget | PlanAction::CopyTargetToSource => result.copied += 1,
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Root validation
// ---------------------------------------------------------------------------

fn ensure_dir(side: &'static str, path: &Path) -> Result<(), ConfigError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ConfigError::NotADirectory {
            side,
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(ConfigError::MissingRoot {
            side,
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ConfigError::NotAccessible {
            side,
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub(crate) fn validate_root(
    side: &'static str,
    path: &Path,
    writable: bool,
) -> Result<PathBuf, ConfigError> {
    ensure_dir(side, path)?;
    let not_accessible = |source| ConfigError::NotAccessible {
        side,
        path: path.to_path_buf(),
        source,
    };
    std::fs::read_dir(path).map_err(not_accessible)?;
    if writable {
        let meta = std::fs::metadata(path).map_err(not_accessible)?;
        if meta.permissions().readonly() {
            return Err(ConfigError::ReadOnly {
                side,
                path: path.to_path_buf(),
            });
        }
    }
    path.canonicalize().map_err(not_accessible)
}

/// Roots that contain one another would sync a tree into itself.
pub(crate) fn check_overlap(source_root: &Path, target_root: &Path) -> Result<(), ConfigError> {
    if source_root.starts_with(target_root) || target_root.starts_with(source_root) {
        return Err(ConfigError::OverlappingRoots {
            source_root: source_root.to_path_buf(),
            target_root: target_root.to_path_buf(),
        });
    }
    Ok(())
}
