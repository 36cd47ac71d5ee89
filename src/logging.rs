//! Tracing subscriber setup.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::Error;

pub const LOG_FILE_PREFIX: &str = "convo-assist.log";

/// Install the global subscriber. `RUST_LOG` wins; otherwise `info`.
///
/// With `log_dir`, output goes to a daily rolling file instead of stderr and
/// the returned guard must be held until shutdown so buffered lines flush.
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                Error::Logging(format!(
                    "failed to create log directory '{}': {e}",
                    dir.display()
                ))
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(log_dir.is_none())
        .with_writer(writer)
        .try_init()
        .map_err(|e| Error::Logging(format!("failed to set subscriber: {e}")))?;

    Ok(guard)
}
