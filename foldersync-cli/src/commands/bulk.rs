//! `foldersync bulk`: sync every unit directory under a source root.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use foldersync_core::{BulkSyncReport, Settings, SyncMode, UnitReport, UnitStatus};
use foldersync_sync::{sync_all, BulkOptions};

use super::{merge_excludes, RunStatus};

/// Arguments for `foldersync bulk`.
#[derive(Args, Debug)]
pub struct BulkArgs {
    /// Directory whose immediate subdirectories are the units.
    pub source: PathBuf,

    /// Directory that receives one subdirectory per unit.
    pub target: PathBuf,

    /// Also pull newer target changes back into the source units.
    #[arg(long)]
    pub bidirectional: bool,

    /// Sync into units whose target entry is a symlink instead of skipping them.
    #[arg(long)]
    pub no_skip_symlinks: bool,

    /// Plan only; report what would change without writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Additional glob to exclude; repeatable.
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,

    /// Units synced in parallel [default: settings file, else 4].
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Treat modification times this close as equal.
    #[arg(long, value_name = "MS")]
    pub mtime_tolerance_ms: Option<u64>,
}

#[derive(Tabled)]
struct UnitTableRow {
    #[tabled(rename = "unit")]
    unit: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "copied")]
    copied: String,
    #[tabled(rename = "dirs")]
    dirs: String,
    #[tabled(rename = "skipped")]
    skipped: String,
    #[tabled(rename = "errors")]
    errors: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl BulkArgs {
    pub fn run(self, settings: &Settings) -> Result<RunStatus> {
        let options = BulkOptions {
            mode: if self.bidirectional {
                SyncMode::Bidirectional
            } else {
                SyncMode::OneWay
            },
            skip_symlinks: !self.no_skip_symlinks,
            dry_run: self.dry_run,
            extra_excludes: merge_excludes(&settings.extra_excludes, &self.excludes),
            workers: self.workers.unwrap_or(settings.bulk_workers),
            mtime_tolerance: self
                .mtime_tolerance_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| settings.mtime_tolerance()),
        };

        let report = sync_all(&self.source, &self.target, &options)
            .with_context(|| format!("bulk sync failed for '{}'", self.source.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize bulk JSON")?
            );
        } else {
            print_table(&report, &options);
        }

        Ok(RunStatus::from_errors(report.has_errors()))
    }
}

fn print_table(report: &BulkSyncReport, options: &BulkOptions) {
    let prefix = if options.dry_run { "[dry-run] " } else { "" };
    println!(
        "{prefix}{} units | {} synced | {} skipped | {} failed ({})",
        report.units.len(),
        report.synced_count,
        report.skipped_count,
        report.error_count,
        options.mode
    );

    if report.units.is_empty() {
        println!("No units found.");
        return;
    }

    let rows: Vec<UnitTableRow> = report.units.iter().map(table_row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    for unit in &report.units {
        if let UnitStatus::Synced { result } = &unit.status {
            for issue in &result.errors {
                eprintln!("  {} {}: {issue}", "✗".red().bold(), unit.name);
            }
        }
    }
}

fn table_row(unit: &UnitReport) -> UnitTableRow {
    let dash = || "-".to_string();
    match &unit.status {
        UnitStatus::Synced { result } => UnitTableRow {
            unit: unit.name.clone(),
            status: if result.has_errors() {
                "PARTIAL".yellow().bold().to_string()
            } else {
                "SYNCED".green().bold().to_string()
            },
            copied: result.copied.to_string(),
            dirs: result.dirs_created.to_string(),
            skipped: result.skipped.to_string(),
            errors: result.errors.len().to_string(),
            detail: String::new(),
        },
        UnitStatus::Skipped { reason } => UnitTableRow {
            unit: unit.name.clone(),
            status: "SKIPPED".bright_black().bold().to_string(),
            copied: dash(),
            dirs: dash(),
            skipped: dash(),
            errors: dash(),
            detail: reason.clone(),
        },
        UnitStatus::Failed { error } => UnitTableRow {
            unit: unit.name.clone(),
            status: "FAILED".red().bold().to_string(),
            copied: dash(),
            dirs: dash(),
            skipped: dash(),
            errors: dash(),
            detail: error.clone(),
        },
    }
}
