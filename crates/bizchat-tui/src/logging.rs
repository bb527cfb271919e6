//! File logging. The terminal belongs to the UI, so logs go to
//! `<data_dir>/bizchat/logs/bizchat.log.<date>`.

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

// The binary's own target is `bizchat`, the library's is `bizchat_core`.
const DEFAULT_FILTER: &str = "bizchat=info,bizchat_core=info";

/// Install the global subscriber. Keep the returned guard alive until exit so
/// buffered lines are flushed. Returns `None` when there is no data directory.
pub fn init() -> Result<Option<WorkerGuard>> {
    let Some(log_dir) = dirs::data_dir().map(|d| d.join("bizchat").join("logs")) else {
        return Ok(None);
    };
    std::fs::create_dir_all(&log_dir)?;

    let appender = tracing_appender::rolling::daily(&log_dir, "bizchat.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))?;

    Ok(Some(guard))
}
