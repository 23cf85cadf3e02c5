use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use coursevault_core::{DISCOVERY_TARGET, REJECTION_TARGET};

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_use_progress(
    stderr_is_terminal: bool,
    quiet: bool,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

/// Discovery and rejection chatter goes to the log file only.
pub(crate) fn is_console_target(target: &str) -> bool {
    !(target.starts_with(DISCOVERY_TARGET) || target.starts_with(REJECTION_TARGET))
}

/// The log file records at least `info`, more when the console is more verbose.
pub(crate) fn file_log_level(default_level: &str) -> &str {
    match default_level {
        "debug" | "trace" => default_level,
        _ => "info",
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Installs the console subscriber and, when `log_file` is set, an appending
/// file writer. Keep the returned guard alive until exit so the file is flushed.
pub(crate) fn init_tracing(default_level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter(default_level))
        .with_filter(filter_fn(|metadata| is_console_target(metadata.target())));

    let (file, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("cannot create log directory {}", parent.display())
                })?;
            }
            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(handle);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter(file_log_level(default_level)));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
    Ok(guard)
}
