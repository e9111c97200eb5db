pub use crate::error::{BoxError, Result, TimelineError};
pub use crate::timeline::*;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt::Layer, prelude::*, registry::Registry};

use std::path::Path;
use std::sync::{Mutex, OnceLock};

mod error;
mod timeline;

static TRACING_GUARDS: OnceLock<Mutex<Option<(WorkerGuard, WorkerGuard)>>> = OnceLock::new();

/// Install the global tracing subscriber: stdout plus a daily rolling file in
/// `logs_dir`, filtered by `RUST_LOG` (default `info`).
///
/// Only the first successful call installs anything; later calls are no-ops.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created, the file appender
/// cannot be built, or another global subscriber is already installed.
pub fn init_tracing(logs_dir: &Path) -> Result<()> {
    if TRACING_GUARDS.get().is_some() {
        return Ok(());
    }

    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create logs directory: {:?}", logs_dir))?;

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("timeline-tiles")
        .filename_suffix("log")
        .build(logs_dir)
        .map_err(|e| TimelineError::LoggingSetup(e.to_string()))?;

    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
    let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let stdout_layer = Layer::new()
        .with_writer(non_blocking_stdout)
        .with_ansi(true)
        .with_target(true);

    let file_layer = Layer::new()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| TimelineError::LoggingSetup(e.to_string()))?;

    TRACING_GUARDS
        .set(Mutex::new(Some((file_guard, stdout_guard))))
        .ok();

    tracing::debug!("Logging initialized in directory: {:?}", logs_dir);
    Ok(())
}
