// External crates
use anyhow::{Context, Result};
use clap::ValueEnum;
use std::io::IsTerminal;
use std::panic;
use std::path::PathBuf;
use tracing::{Dispatch, error};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
    prelude::*,
    registry::Registry,
};

/// Output format of diagnostic log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// How the user asked for logging to be set up.
#[derive(Debug, Clone, Default)]
pub struct TelemetryOptions {
    /// Number of `-v` flags given on the command line.
    pub verbosity: u8,
    pub format: LogFormat,
    /// Write logs to this file instead of stderr.
    pub log_file: Option<PathBuf>,
}

/// Logging context for one invocation.
///
/// Nothing is installed globally: callers scope the [`Dispatch`] around the
/// work they run, and keep this value alive until that work is done so the
/// background writer gets flushed.
#[derive(Debug)]
pub struct Telemetry {
    dispatch: Dispatch,
    _guard: WorkerGuard,
}

impl Telemetry {
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

/// Level used when `RUST_LOG` is not set.
///
/// Quiet by default: stderr is also where dry run output and errors go.
#[must_use]
pub fn default_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

pub fn init_tracing(options: &TelemetryOptions) -> Result<Telemetry> {
    let (non_blocking_writer, guard) = match &options.log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .with_context(|| format!("log file path {} has no file name", path.display()))?;
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            tracing_appender::non_blocking(rolling::never(directory, file_name))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let filter = EnvFilter::builder()
        .with_default_directive(default_level(options.verbosity).into())
        .from_env_lossy();

    let with_ansi = options.log_file.is_none() && std::io::stderr().is_terminal();

    let fmt_layer = (options.format == LogFormat::Text).then(|| {
        fmt::layer()
            .with_ansi(with_ansi)
            .with_writer(non_blocking_writer.clone())
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    });

    let json_layer = (options.format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_writer(non_blocking_writer.clone())
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    });

    let error_layer = ErrorLayer::default();

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(json_layer)
        .with(error_layer);

    Ok(Telemetry {
        dispatch: Dispatch::new(subscriber),
        _guard: guard,
    })
}

/// Report panics through the given logging context before the default hook runs.
pub fn init_panic_handler(dispatch: Dispatch) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let msg = match panic_info.payload().downcast_ref::<&str>() {
            Some(s) => (*s).to_string(),
            None => match panic_info.payload().downcast_ref::<String>() {
                Some(s) => s.clone(),
                None => "Unknown panic".to_string(),
            },
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());

        tracing::dispatcher::with_default(&dispatch, || {
            error!(
                message = %msg,
                location = %location,
                "Application panicked!"
            );
        });

        default_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_default_level() {
        assert_eq!(default_level(0), LevelFilter::WARN);
        assert_eq!(default_level(1), LevelFilter::INFO);
        assert_eq!(default_level(2), LevelFilter::DEBUG);
        assert_eq!(default_level(3), LevelFilter::TRACE);
        assert_eq!(default_level(9), LevelFilter::TRACE);
    }

    #[test]
    fn file_logging_writes_to_requested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datadog.log");

        let telemetry = init_tracing(&TelemetryOptions {
            verbosity: 1,
            format: LogFormat::Json,
            log_file: Some(path.clone()),
        })
        .unwrap();

        tracing::dispatcher::with_default(telemetry.dispatch(), || {
            tracing::warn!(probe = "file_logging", "probe event");
        });
        drop(telemetry);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("probe event"));
        assert!(written.contains("file_logging"));
    }
}
