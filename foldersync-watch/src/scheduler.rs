use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use foldersync_core::{ConfigError, SyncResult};
use foldersync_sync::{run_once_with, PairConfig, Phase};

use crate::error::WatchError;

/// Where the loop currently is. `Stopped` is only entered between a sleep and
/// the next scan, so a tick is never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchState {
    Idle,
    Scanning,
    Diffing,
    Applying,
    Sleeping,
    Stopped,
}

impl From<Phase> for WatchState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Scanning => WatchState::Scanning,
            Phase::Diffing => WatchState::Diffing,
            Phase::Applying => WatchState::Applying,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TickOutcome {
    Synced { result: SyncResult },
    /// The cycle could not run, e.g. a root disappeared. The loop continues.
    Failed { error: String },
}

/// Handed to the tick callback after every cycle.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    /// 1-based.
    pub tick: u64,
    pub started_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: TickOutcome,
}

impl TickReport {
    pub fn has_errors(&self) -> bool {
        match &self.outcome {
            TickOutcome::Synced { result } => result.has_errors(),
            TickOutcome::Failed { .. } => true,
        }
    }
}

/// Returned when the loop stops because its token was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatchStop {
    pub ticks: u64,
    /// Ticks that failed or finished with per-item errors.
    pub ticks_with_errors: u64,
}

impl WatchStop {
    pub fn has_errors(&self) -> bool {
        self.ticks_with_errors > 0
    }
}

/// Runs one pair on a fixed interval. Ticks never overlap and share no state.
pub struct WatchScheduler {
    config: Arc<PairConfig>,
    interval: Duration,
    dry_run: bool,
    state: Arc<watch::Sender<WatchState>>,
}

impl WatchScheduler {
    /// Fails with [`ConfigError::ZeroInterval`] for a zero interval.
    pub fn new(config: PairConfig, interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        let (state, _) = watch::channel(WatchState::Idle);
        Ok(Self {
            config: Arc::new(config),
            interval,
            dry_run: false,
            state: Arc::new(state),
        })
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn config(&self) -> &PairConfig {
        &self.config
    }

    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<WatchState> {
        self.state.subscribe()
    }

    /// Tick until `cancel` fires.
    ///
    /// Cancellation is honoured only while sleeping or right before a tick
    /// starts; a running tick always completes and is reported.
    pub async fn run<F>(
        &self,
        cancel: CancellationToken,
        mut on_tick: F,
    ) -> Result<WatchStop, WatchError>
    where
        F: FnMut(&TickReport),
    {
        tracing::info!(
            source = %self.config.source_root.display(),
            target = %self.config.target_root.display(),
            mode = %self.config.mode,
            interval_ms = self.interval.as_millis() as u64,
            "watch started"
        );

        let mut ticks = 0u64;
        let mut ticks_with_errors = 0u64;
        loop {
            if cancel.is_cancelled() {
                break;
            }
            ticks += 1;
            let report = self.tick(ticks).await?;
            if report.has_errors() {
                ticks_with_errors += 1;
            }
            on_tick(&report);

            self.state.send_replace(WatchState::Sleeping);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.state.send_replace(WatchState::Stopped);
        tracing::info!(ticks, ticks_with_errors, "watch stopped");
        Ok(WatchStop {
            ticks,
            ticks_with_errors,
        })
    }

    async fn tick(&self, tick: u64) -> Result<TickReport, WatchError> {
        let started_at = Utc::now();
        let config = Arc::clone(&self.config);
        let state = Arc::clone(&self.state);
        let dry_run = self.dry_run;

        let cycle = tokio::task::spawn_blocking(move || {
            run_once_with(&config, dry_run, |phase| {
                state.send_replace(phase.into());
            })
        })
        .await?;

        let outcome = match cycle {
            Ok(run) => {
                let result = run.result;
                tracing::info!(
                    tick,
                    copied = result.copied,
                    dirs_created = result.dirs_created,
                    skipped = result.skipped,
                    errors = result.errors.len(),
                    duration_ms = result.duration_ms as u64,
                    "tick complete"
                );
                TickOutcome::Synced { result }
            }
            Err(err) => {
                tracing::warn!(tick, error = %err, "tick failed");
                TickOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };

        Ok(TickReport {
            tick,
            started_at,
            outcome,
        })
    }
}

/// Run `scheduler` on a fresh runtime until Ctrl-C, blocking the current thread.
pub fn start_blocking<F>(scheduler: WatchScheduler, on_tick: F) -> Result<WatchStop, WatchError>
where
    F: FnMut(&TickReport),
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(WatchError::Runtime)?;

    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let signal_handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => Ok(()),
                    signal = tokio::signal::ctrl_c() => match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, stopping after the current tick");
                            cancel.cancel();
                            Ok(())
                        }
                        Err(err) => Err(WatchError::Signal(err)),
                    }
                }
            })
        };

        let stop = scheduler.run(cancel.clone(), on_tick).await;
        cancel.cancel();
        match signal_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "signal handler"),
            Err(err) => tracing::warn!(error = %err, "signal handler join failure"),
        }
        stop
    })
}

/// Install the fmt subscriber (and the `log` bridge) once per process.
///
/// `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
