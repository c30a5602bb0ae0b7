//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Optional file to append to instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from file settings with env overrides.
    ///
    /// Filter precedence: `WORDVEC_LOG`, `RUST_LOG`, `--verbose`, the
    /// configured filter, then `info`. `WORDVEC_LOG_FORMAT` and
    /// `WORDVEC_LOG_FILE` override the format and file.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        Self::from_lookup(settings, verbose, |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(settings: &LoggingSettings, verbose: bool, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let directive = env("WORDVEC_LOG")
            .or_else(|| env("RUST_LOG"))
            .or_else(|| verbose.then(|| "debug".to_string()))
            .or_else(|| settings.filter.clone())
            .unwrap_or_else(|| "info".to_string());
        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
            tracing::warn!(directive, error = %e, "Invalid log filter, using 'info'");
            EnvFilter::new("info")
        });

        let format = env("WORDVEC_LOG_FORMAT")
            .or_else(|| settings.format.clone())
            .and_then(|value| LogFormat::parse(&value))
            .unwrap_or_default();

        let file = env("WORDVEC_LOG_FILE")
            .or_else(|| settings.file.clone())
            .map(PathBuf::from);

        Self {
            format,
            filter,
            file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_lookup(&LoggingSettings::default(), false, lookup(&[]));
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.filter.to_string(), "info");
        assert!(config.file.is_none());
    }

    #[test]
    fn test_env_beats_verbose_and_settings() {
        let settings = LoggingSettings {
            format: Some("pretty".to_string()),
            filter: Some("warn".to_string()),
            file: Some("/tmp/a.log".to_string()),
        };
        let config = LoggingConfig::from_lookup(
            &settings,
            true,
            lookup(&[("WORDVEC_LOG", "wordvec=trace"), ("WORDVEC_LOG_FORMAT", "JSON")]),
        );
        assert_eq!(config.filter.to_string(), "wordvec=trace");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/a.log")));
    }

    #[test]
    fn test_verbose_beats_settings_filter() {
        let settings = LoggingSettings {
            filter: Some("warn".to_string()),
            ..LoggingSettings::default()
        };
        let config = LoggingConfig::from_lookup(&settings, true, lookup(&[]));
        assert_eq!(config.filter.to_string(), "debug");
    }

    #[test]
    fn test_unknown_format_falls_back_to_pretty() {
        let config = LoggingConfig::from_lookup(
            &LoggingSettings::default(),
            false,
            lookup(&[("WORDVEC_LOG_FORMAT", "xml")]),
        );
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
