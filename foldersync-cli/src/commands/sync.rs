//! `foldersync sync`: one pair, once or on an interval.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use foldersync_core::{PlanAction, Settings, SyncIssue, SyncMode, SyncPlanItem, SyncResult};
use foldersync_sync::{run_once, PairConfig};
use foldersync_watch::{start_blocking, TickOutcome, TickReport, WatchScheduler};

use super::{merge_excludes, RunStatus};

/// Arguments for `foldersync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Directory whose changes always propagate.
    pub source: PathBuf,

    /// Directory kept in step with the source.
    pub target: PathBuf,

    /// Only copy source → target; never modify the source.
    #[arg(long)]
    pub one_way: bool,

    /// Keep syncing on an interval until Ctrl-C.
    #[arg(long)]
    pub watch: bool,

    /// Seconds between watch ticks [default: settings file, else 5].
    #[arg(long, value_name = "SECS", requires = "watch")]
    pub interval: Option<u64>,

    /// Additional glob to exclude; repeatable.
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,

    /// Plan only; report what would change without writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON (one object per tick with --watch).
    #[arg(long)]
    pub json: bool,

    /// Treat modification times this close as equal.
    #[arg(long, value_name = "MS")]
    pub mtime_tolerance_ms: Option<u64>,
}

#[derive(Serialize)]
struct SyncJson<'a> {
    source: &'a PathBuf,
    target: &'a PathBuf,
    mode: SyncMode,
    plan: Vec<&'a SyncPlanItem>,
    result: &'a SyncResult,
}

impl SyncArgs {
    pub fn run(self, settings: &Settings, verbose: bool) -> Result<RunStatus> {
        let mode = if self.one_way {
            SyncMode::OneWay
        } else {
            SyncMode::Bidirectional
        };
        let excludes = merge_excludes(&settings.extra_excludes, &self.excludes);
        let tolerance = self
            .mtime_tolerance_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| settings.mtime_tolerance());
        let config =
            PairConfig::new(&self.source, &self.target, mode, &excludes)?.with_tolerance(tolerance);

        if self.watch {
            let interval = Duration::from_secs(
                self.interval.unwrap_or(settings.watch_interval_secs),
            );
            return self.run_watch(config, interval);
        }

        let run = run_once(&config, self.dry_run)
            .with_context(|| format!("sync failed for '{}'", self.source.display()))?;

        if self.json {
            let payload = SyncJson {
                source: &config.source_root,
                target: &config.target_root,
                mode,
                plan: run.plan.iter().filter(|i| i.action.is_mutation()).collect(),
                result: &run.result,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize sync JSON")?
            );
        } else {
            print_summary(&config, &run.result);
            if verbose || self.dry_run {
                print_plan(&run.plan);
            }
            print_issues(&run.result.errors);
        }

        Ok(RunStatus::from_errors(run.result.has_errors()))
    }

    fn run_watch(&self, config: PairConfig, interval: Duration) -> Result<RunStatus> {
        let scheduler = WatchScheduler::new(config, interval)?.dry_run(self.dry_run);
        if !self.json {
            println!(
                "watching {} ⇄ {} every {}s (Ctrl-C to stop)",
                scheduler.config().source_root.display(),
                scheduler.config().target_root.display(),
                interval.as_secs()
            );
        }

        let json = self.json;
        let stop = start_blocking(scheduler, |report| print_tick(report, json))
            .context("watch loop exited with error")?;

        if !json {
            println!(
                "stopped after {} ticks ({} with errors)",
                stop.ticks, stop.ticks_with_errors
            );
        }
        Ok(RunStatus::from_errors(stop.has_errors()))
    }
}

fn print_tick(report: &TickReport, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("failed to serialize tick {}: {err}", report.tick),
        }
        return;
    }

    let stamp = report
        .started_at
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S");
    match &report.outcome {
        TickOutcome::Synced { result } => {
            let line = format!(
                "[{stamp}] tick {}: {} copied, {} dirs created, {} skipped, {} errors",
                report.tick,
                result.copied,
                result.dirs_created,
                result.skipped,
                result.errors.len()
            );
            if result.has_errors() {
                println!("{}", line.yellow());
                print_issues(&result.errors);
            } else if result.changes() > 0 {
                println!("{}", line.green());
            } else {
                println!("{line}");
            }
        }
        TickOutcome::Failed { error } => {
            println!("{}", format!("[{stamp}] tick {} failed: {error}", report.tick).red());
        }
    }
}

fn print_summary(config: &PairConfig, result: &SyncResult) {
    let prefix = if result.dry_run { "[dry-run] " } else { "" };
    let mark = if result.has_errors() {
        "!".yellow().bold()
    } else {
        "✓".green().bold()
    };
    println!(
        "{prefix}{mark} {} → {} ({})",
        config.source_root.display(),
        config.target_root.display(),
        config.mode
    );
    println!(
        "  {} copied, {} dirs created, {} skipped, {} errors in {}ms",
        result.copied,
        result.dirs_created,
        result.skipped,
        result.errors.len(),
        result.duration_ms
    );
}

fn print_plan(plan: &[SyncPlanItem]) {
    for item in plan.iter().filter(|i| i.action.is_mutation()) {
        let arrow = match item.action {
            PlanAction::CopySourceToTarget => "→",
            PlanAction::CopyTargetToSource => "←",
            PlanAction::CreateDir { .. } => "+",
            PlanAction::Skip => "·",
        };
        println!("  {arrow}  {} ({})", item.relative_path, item.reason);
    }
}

fn print_issues(errors: &[SyncIssue]) {
    for issue in errors {
        eprintln!("  {} {issue}", "✗".red().bold());
    }
}
