//! Prometheus metrics.
//!
//! Metric names emitted by the crate:
//!
//! | Name | Kind | Labels |
//! |------|------|--------|
//! | `wordvec_requests_total` | counter | `operation`, `outcome` |
//! | `wordvec_operation_duration_ms` | histogram | `operation` |
//! | `wordvec_store_query_duration_ms` | histogram | `backend`, `operation` |
//! | `wordvec_load_rows_total` | counter | `outcome` |

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics::Unit;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Service calls by operation and outcome.
pub const REQUESTS_TOTAL: &str = "wordvec_requests_total";
/// Service call latency.
pub const OPERATION_DURATION_MS: &str = "wordvec_operation_duration_ms";
/// Latency of individual store queries.
pub const STORE_QUERY_DURATION_MS: &str = "wordvec_store_query_duration_ms";
/// Rows seen by the vectors-file loader.
pub const LOAD_ROWS_TOTAL: &str = "wordvec_load_rows_total";

const DEFAULT_METRICS_PORT: u16 = 9090;

/// Exporter settings after environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Install the exporter at all.
    pub enabled: bool,
    /// Scrape endpoint address.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Reads `[metrics]` settings, overridden by `WORDVEC_METRICS_ENABLED`
    /// and `WORDVEC_METRICS_PORT`.
    #[must_use]
    pub fn from_settings(settings: &MetricsSettings) -> Self {
        Self::from_lookup(settings, |key| std::env::var(key).ok())
    }

    /// Like [`Self::from_settings`] with an injectable environment.
    #[must_use]
    pub fn from_lookup<F>(settings: &MetricsSettings, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup("WORDVEC_METRICS_ENABLED")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .or(settings.enabled)
            .unwrap_or(false);
        let port = lookup("WORDVEC_METRICS_PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .or(settings.port)
            .unwrap_or(DEFAULT_METRICS_PORT);

        Self {
            enabled,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        }
    }
}

/// Installs the global Prometheus recorder and its scrape listener.
///
/// Must run inside a Tokio runtime; the exporter is spawned onto it.
/// Returns `None` when metrics are disabled, in which case every
/// `metrics` macro in the crate is a no-op.
///
/// # Errors
///
/// Returns an error if no runtime is active, the listener cannot be built,
/// or a global recorder is already installed.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| Error::operation("metrics_runtime", e))?;
    let (recorder, exporter) = {
        let _guard = runtime.enter();
        PrometheusBuilder::new()
            .with_http_listener(config.listen_addr)
            .build()
            .map_err(|e| Error::operation("metrics_exporter_build", e))?
    };
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| Error::operation("metrics_recorder_install", e))?;
    runtime.spawn(exporter);

    describe_metrics();
    tracing::info!(addr = %config.listen_addr, "Prometheus exporter listening");
    Ok(Some(handle))
}

/// Registers help text and units with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(REQUESTS_TOTAL, "Word operations by outcome");
    metrics::describe_histogram!(
        OPERATION_DURATION_MS,
        Unit::Milliseconds,
        "Word operation latency"
    );
    metrics::describe_histogram!(
        STORE_QUERY_DURATION_MS,
        Unit::Milliseconds,
        "Embedding store query latency"
    );
    metrics::describe_counter!(LOAD_ROWS_TOTAL, "Vectors-file rows by outcome");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_disabled_without_settings() {
        let config = MetricsConfig::from_lookup(&MetricsSettings::default(), lookup(&[]));
        assert!(!config.enabled);
        assert_eq!(config.listen_addr.port(), 9090);
        assert!(install_prometheus(&config).unwrap().is_none());
    }

    #[test]
    fn test_env_overrides_settings() {
        let settings = MetricsSettings {
            enabled: Some(false),
            port: Some(9100),
        };
        let config = MetricsConfig::from_lookup(
            &settings,
            lookup(&[("WORDVEC_METRICS_ENABLED", "ON"), ("WORDVEC_METRICS_PORT", "9200")]),
        );
        assert!(config.enabled);
        assert_eq!(config.listen_addr.port(), 9200);
    }

    #[test]
    fn test_bad_port_falls_back_to_settings() {
        let settings = MetricsSettings {
            enabled: None,
            port: Some(9100),
        };
        let config =
            MetricsConfig::from_lookup(&settings, lookup(&[("WORDVEC_METRICS_PORT", "http")]));
        assert_eq!(config.listen_addr.port(), 9100);
    }

    #[test]
    fn test_request_counter_renders_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_metrics();
            metrics::counter!(REQUESTS_TOTAL, "operation" => "neighbours", "outcome" => "success")
                .increment(2);
        });
        let rendered = handle.render();
        assert!(rendered.contains("wordvec_requests_total{operation=\"neighbours\",outcome=\"success\"} 2"));
    }
}
