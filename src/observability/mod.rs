//! Observability: structured logging and Prometheus metrics.
//!
//! Request correlation IDs live in the HTTP layer; see
//! [`crate::http::RequestId`].

mod logging;
mod metrics;

pub use logging::{LogFormat, LoggingConfig};
pub use metrics::{
    LOAD_ROWS_TOTAL, MetricsConfig, OPERATION_DURATION_MS, REQUESTS_TOTAL,
    STORE_QUERY_DURATION_MS, describe_metrics, install_prometheus,
};

use crate::config::AppConfig;
use crate::{Error, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

/// Logging plus metrics settings for one process.
#[derive(Debug)]
pub struct ObservabilityConfig {
    /// Subscriber settings.
    pub logging: LoggingConfig,
    /// Exporter settings.
    pub metrics: MetricsConfig,
}

impl ObservabilityConfig {
    /// Resolves observability settings from the app config and environment.
    #[must_use]
    pub fn from_app_config(config: &AppConfig, verbose: bool) -> Self {
        Self {
            logging: LoggingConfig::from_settings(&config.logging, verbose),
            metrics: MetricsConfig::from_settings(&config.metrics),
        }
    }
}

/// Keeps the metrics recorder reachable for the life of the process.
pub struct ObservabilityHandle {
    metrics: Option<PrometheusHandle>,
}

impl ObservabilityHandle {
    /// Returns `true` when the Prometheus exporter is running.
    #[must_use]
    pub const fn metrics_enabled(&self) -> bool {
        self.metrics.is_some()
    }
}

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber and, when enabled, the metrics exporter.
///
/// Events go to stderr unless a log file is configured. Text output is
/// pretty-printed on stderr and compact without ANSI colours in files.
///
/// # Errors
///
/// Returns an error on a second call, if the log file cannot be opened, or
/// if the metrics exporter fails to start.
pub fn init(config: ObservabilityConfig) -> Result<ObservabilityHandle> {
    if INITIALIZED.get().is_some() {
        return Err(Error::operation(
            "observability_init",
            "observability already initialized",
        ));
    }

    let LoggingConfig {
        format,
        filter,
        file,
    } = config.logging;
    let to_file = file.is_some();
    let writer = match &file {
        Some(path) => BoxMakeWriter::new(Mutex::new(open_log_file(path)?)),
        None => BoxMakeWriter::new(io::stderr),
    };

    let events: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Pretty if to_file => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(events)
        .with(filter)
        .try_init()
        .map_err(|e| Error::operation("tracing_subscriber_init", e))?;

    let metrics = install_prometheus(&config.metrics)?;
    // A lost race means another caller finished initializing first.
    let _ = INITIALIZED.set(());
    tracing::debug!(
        format = ?format,
        log_file = ?file,
        metrics = metrics.is_some(),
        "Observability initialized"
    );

    Ok(ObservabilityHandle { metrics })
}

/// Opens a log file for appending, creating parent directories.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_log_dir", e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::operation("open_log_file", format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_log_file_creates_parents_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("wordvec.log");

        open_log_file(&path).unwrap().write_all(b"first\n").unwrap();
        open_log_file(&path).unwrap().write_all(b"second\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_open_log_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let err = open_log_file(dir.path()).unwrap_err();
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }
}
