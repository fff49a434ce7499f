//! Periodic Scan → Diff → Apply of one directory pair until cancelled.

mod error;
pub mod scheduler;

pub use error::WatchError;
pub use scheduler::{
    init_tracing, start_blocking, TickOutcome, TickReport, WatchScheduler, WatchState, WatchStop,
};
