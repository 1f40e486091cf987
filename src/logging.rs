//! Tracing setup for the `lessonbook` binary.
//!
//! Sync runs log one event per schedule file (download, parse, store) plus a
//! summary, and note edits log at `debug`. Events go to journald when it is
//! reachable, otherwise to `lessonbook.log` rotated daily. Nothing is written
//! to the terminal, which stays reserved for command output.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "LESSONBOOK_LOG";

/// Filter used when `LESSONBOOK_LOG` is unset or invalid. HTTP and SQLite
/// internals stay quiet unless asked for explicitly.
const DEFAULT_DIRECTIVE: &str = "lessonbook=info,warn";

/// Where log events end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogBackend {
    Journald,
    File(PathBuf),
}

/// Build the filter from a directive such as `debug` or
/// `lessonbook::schedule=trace`. Falls back to the default on bad input.
fn filter_from(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber and report which backend took it.
///
/// `log_dir` overrides the fallback file location
/// (`$XDG_DATA_HOME/lessonbook/logs`). Calling this twice is an error.
pub fn init(log_dir: Option<PathBuf>) -> Result<LogBackend> {
    let directive = std::env::var(LOG_ENV).ok();
    let filter = filter_from(directive.as_deref());

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(filter)
                .with(journald.with_syslog_identifier("lessonbook".to_string()))
                .try_init()?;
            tracing::debug!("Logging to journald");
            return Ok(LogBackend::Journald);
        }
    }

    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "lessonbook.log"));
    // Dropping the guard stops the writer thread; keep it for the process lifetime.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
        .try_init()?;
    tracing::debug!(dir = %log_dir.display(), "Logging to file");
    Ok(LogBackend::File(log_dir))
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lessonbook")
        .join("logs")
}
