//! Configuration management.
//!
//! Settings are resolved from three layers, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, `WORDVEC_CONFIG_PATH`, or
//!    `<config_dir>/wordvec/config.toml`)
//! 3. Environment variables
//!
//! # Example
//!
//! ```toml
//! [server]
//! port = 8080
//! base_path = "/api"
//!
//! [database]
//! host = "db.internal"
//! table = "glove_300d"
//!
//! [search]
//! default_metric = "l2"
//! ```

use crate::models::Metric;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "WORDVEC_CONFIG_PATH";

/// Main configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// PostgreSQL settings.
    pub database: DatabaseConfig,
    /// Store backend selection.
    pub store: StoreConfig,
    /// Search defaults and limits.
    pub search: SearchConfig,
    /// Logging settings (resolved by [`crate::observability`]).
    pub logging: LoggingSettings,
    /// Metrics settings (resolved by [`crate::observability`]).
    pub metrics: MetricsSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Prefix under which every route is mounted.
    pub base_path: String,
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_path: "/api".to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl ServerConfig {
    /// Returns the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL; overrides the discrete fields when set.
    pub url: Option<SecretString>,
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login user.
    pub user: Option<String>,
    /// Login password.
    pub password: Option<SecretString>,
    /// Database name.
    pub dbname: String,
    /// Embeddings table, optionally schema-qualified.
    pub table: String,
    /// Maximum pooled connections.
    pub pool_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "127.0.0.1".to_string(),
            port: 5433,
            user: None,
            password: None,
            dbname: "postgres".to_string(),
            table: "word_embeddings".to_string(),
            pool_size: 16,
        }
    }
}

/// Which store answers queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL with pgvector.
    #[default]
    Postgres,
    /// In-process store loaded from a vectors file.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pgvector" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(Error::InvalidInput(format!("unknown store backend '{other}'"))),
        }
    }
}

/// Store backend settings.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Backend selection.
    pub backend: StoreBackend,
    /// GloVe-format file loaded by the memory backend.
    pub vectors_file: Option<PathBuf>,
    /// Vector width; required by the memory backend and by `migrate`.
    pub dimensions: Option<usize>,
}

/// Search defaults and limits.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Neighbour count when `n` is omitted.
    pub default_neighbours: usize,
    /// Result count when `limit` is omitted.
    pub default_results_limit: usize,
    /// Upper bound accepted for `n` and `limit`.
    pub max_limit: usize,
    /// Metric used when `metric` is omitted.
    pub default_metric: Metric,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_neighbours: 10,
            default_results_limit: 20,
            max_limit: 1000,
            default_metric: Metric::Cosine,
        }
    }
}

/// Logging settings from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directive, e.g. `wordvec=debug,tower_http=info`.
    pub filter: Option<String>,
    /// Append log output to this file instead of stderr.
    pub file: Option<String>,
}

/// Metrics settings from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Whether the Prometheus exporter is installed.
    pub enabled: Option<bool>,
    /// Exporter listen port.
    pub port: Option<u16>,
}

/// Configuration file structure. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    server: Option<ServerSection>,
    database: Option<DatabaseSection>,
    store: Option<StoreSection>,
    search: Option<SearchSection>,
    logging: Option<LoggingSettings>,
    metrics: Option<MetricsSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
    base_path: Option<String>,
    cors_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
    url: Option<SecretString>,
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<SecretString>,
    dbname: Option<String>,
    table: Option<String>,
    pool_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct StoreSection {
    backend: Option<StoreBackend>,
    vectors_file: Option<String>,
    dimensions: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchSection {
    default_neighbours: Option<usize>,
    default_results_limit: Option<usize>,
    max_limit: Option<usize>,
    default_metric: Option<Metric>,
}

impl AppConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::operation("read_config_file", format!("{}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::operation("parse_config_file", e))?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the platform config directory, falling back
    /// to defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be parsed.
    pub fn load_default() -> Result<Self> {
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns `<config_dir>/wordvec/config.toml`, if a home directory exists.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("wordvec").join("config.toml"))
    }

    /// Loads the full configuration: file (explicit path, then
    /// `WORDVEC_CONFIG_PATH`, then the default location) plus environment
    /// overrides, then validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be loaded or the result is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default()?,
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(server) = file.server {
            let target = &mut config.server;
            if let Some(host) = server.host {
                target.host = host;
            }
            if let Some(port) = server.port {
                target.port = port;
            }
            if let Some(base_path) = server.base_path {
                target.base_path = base_path;
            }
            if let Some(origins) = server.cors_origins {
                target.cors_origins = origins;
            }
        }

        if let Some(database) = file.database {
            let target = &mut config.database;
            if database.url.is_some() {
                target.url = database.url;
            }
            if let Some(host) = database.host {
                target.host = host;
            }
            if let Some(port) = database.port {
                target.port = port;
            }
            if database.user.is_some() {
                target.user = database.user;
            }
            if database.password.is_some() {
                target.password = database.password;
            }
            if let Some(dbname) = database.dbname {
                target.dbname = dbname;
            }
            if let Some(table) = database.table {
                target.table = table;
            }
            if let Some(pool_size) = database.pool_size {
                target.pool_size = pool_size;
            }
        }

        if let Some(store) = file.store {
            if let Some(backend) = store.backend {
                config.store.backend = backend;
            }
            if let Some(file) = store.vectors_file {
                config.store.vectors_file = Some(PathBuf::from(file));
            }
            if store.dimensions.is_some() {
                config.store.dimensions = store.dimensions;
            }
        }

        if let Some(search) = file.search {
            let target = &mut config.search;
            if let Some(n) = search.default_neighbours {
                target.default_neighbours = n;
            }
            if let Some(limit) = search.default_results_limit {
                target.default_results_limit = limit;
            }
            if let Some(max) = search.max_limit {
                target.max_limit = max;
            }
            if let Some(metric) = search.default_metric {
                target.default_metric = metric;
            }
        }

        if let Some(logging) = file.logging {
            config.logging = logging;
        }
        if let Some(metrics) = file.metrics {
            config.metrics = metrics;
        }

        config
    }

    /// Applies environment overrides using `lookup` to read variables.
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `PORT` | `server.port` |
    /// | `WORDVEC_HOST` | `server.host` |
    /// | `WORDVEC_BASE_PATH` | `server.base_path` |
    /// | `WORDVEC_CORS_ORIGINS` | `server.cors_origins` (comma-separated) |
    /// | `WORDVEC_DATABASE_URL`, `DATABASE_URL` | `database.url` |
    /// | `DB_HOST`, `DB_PORT`, `DB_NAME` | `database.host`, `.port`, `.dbname` |
    /// | `DB_USER`, `DB_PASS` | `database.user`, `.password` |
    /// | `WORDVEC_TABLE` | `database.table` |
    /// | `WORDVEC_POOL_SIZE` | `database.pool_size` |
    /// | `WORDVEC_STORE` | `store.backend` |
    /// | `WORDVEC_VECTORS_FILE`, `WORDVEC_DIMENSIONS` | `store.vectors_file`, `.dimensions` |
    /// | `WORDVEC_DEFAULT_METRIC` | `search.default_metric` |
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or enumerated variable cannot be parsed.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(port) = get("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(host) = get("WORDVEC_HOST") {
            self.server.host = host;
        }
        if let Some(base_path) = get("WORDVEC_BASE_PATH") {
            self.server.base_path = base_path;
        }
        if let Some(origins) = get("WORDVEC_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(url) = get("WORDVEC_DATABASE_URL").or_else(|| get("DATABASE_URL")) {
            self.database.url = Some(SecretString::from(url));
        }
        if let Some(host) = get("DB_HOST") {
            self.database.host = host;
        }
        if let Some(port) = get("DB_PORT") {
            self.database.port = parse_env("DB_PORT", &port)?;
        }
        if let Some(dbname) = get("DB_NAME") {
            self.database.dbname = dbname;
        }
        if let Some(user) = get("DB_USER") {
            self.database.user = Some(user);
        }
        if let Some(password) = lookup("DB_PASS").filter(|value| !value.is_empty()) {
            self.database.password = Some(SecretString::from(password));
        }
        if let Some(table) = get("WORDVEC_TABLE") {
            self.database.table = table;
        }
        if let Some(size) = get("WORDVEC_POOL_SIZE") {
            self.database.pool_size = parse_env("WORDVEC_POOL_SIZE", &size)?;
        }

        if let Some(backend) = get("WORDVEC_STORE") {
            self.store.backend = backend.parse()?;
        }
        if let Some(file) = get("WORDVEC_VECTORS_FILE") {
            self.store.vectors_file = Some(PathBuf::from(file));
        }
        if let Some(dimensions) = get("WORDVEC_DIMENSIONS") {
            self.store.dimensions = Some(parse_env("WORDVEC_DIMENSIONS", &dimensions)?);
        }
        if let Some(metric) = get("WORDVEC_DEFAULT_METRIC") {
            self.search.default_metric = metric.parse()?;
        }

        Ok(())
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        crate::storage::pgvector::sql::validate_table_name(&self.database.table)?;

        if self.database.pool_size == 0 {
            return Err(Error::InvalidInput("database.pool_size must be at least 1".into()));
        }
        let search = &self.search;
        if search.max_limit == 0 {
            return Err(Error::InvalidInput("search.max_limit must be at least 1".into()));
        }
        for (name, value) in [
            ("search.default_neighbours", search.default_neighbours),
            ("search.default_results_limit", search.default_results_limit),
        ] {
            if value == 0 || value > search.max_limit {
                return Err(Error::InvalidInput(format!(
                    "{name} must be between 1 and {}",
                    search.max_limit
                )));
            }
        }
        if !self.server.base_path.is_empty() && !self.server.base_path.starts_with('/') {
            return Err(Error::InvalidInput("server.base_path must start with '/'".into()));
        }
        if self.store.backend == StoreBackend::Memory {
            if self.store.vectors_file.is_none() {
                return Err(Error::InvalidInput(
                    "store.vectors_file is required for the memory backend".into(),
                ));
            }
            if self.store.dimensions.is_none_or(|d| d == 0) {
                return Err(Error::InvalidInput(
                    "store.dimensions is required for the memory backend".into(),
                ));
            }
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{key}: cannot parse '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::new();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.server.base_path, "/api");
        assert_eq!(config.server.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.database.port, 5433);
        assert_eq!(config.database.table, "word_embeddings");
        assert_eq!(config.search.default_neighbours, 10);
        assert_eq!(config.search.default_results_limit, 20);
        assert_eq!(config.search.default_metric, Metric::Cosine);
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_overrides_only_given_fields() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 8080

            [database]
            table = "public.glove"
            password = "s3cret"

            [search]
            default_metric = "l2"
            max_limit = 50

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.base_path, "/api");
        assert_eq!(config.database.table, "public.glove");
        assert_eq!(
            config.database.password.as_ref().map(|p| p.expose_secret().to_string()),
            Some("s3cret".to_string())
        );
        assert_eq!(config.search.default_metric, Metric::L2);
        assert_eq!(config.search.max_limit, 50);
        assert_eq!(config.search.default_neighbours, 10);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(AppConfig::from_toml("[server]\nprot = 1").is_err());
        assert!(AppConfig::from_toml("[serve]\nport = 1").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store]\nbackend = \"memory\"\nvectors_file = \"v.txt\"\ndimensions = 3\n").unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.vectors_file, Some(PathBuf::from("v.txt")));
        assert_eq!(config.store.dimensions, Some(3));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load_from_file(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::new();
        config
            .apply_env_from(env(&[
                ("PORT", "4000"),
                ("DB_USER", "reader"),
                ("DB_PASS", "pw"),
                ("WORDVEC_TABLE", "glove_50d"),
                ("WORDVEC_CORS_ORIGINS", "http://a.test, http://b.test,"),
                ("WORDVEC_DEFAULT_METRIC", "IP"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.database.user.as_deref(), Some("reader"));
        assert!(config.database.password.is_some());
        assert_eq!(config.database.table, "glove_50d");
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.search.default_metric, Metric::Ip);
    }

    #[test]
    fn test_wordvec_database_url_wins_over_database_url() {
        let mut config = AppConfig::new();
        config
            .apply_env_from(env(&[
                ("DATABASE_URL", "postgres://generic/db"),
                ("WORDVEC_DATABASE_URL", "postgres://specific/db"),
            ]))
            .unwrap();
        let url = config.database.url.as_ref().map(|u| u.expose_secret().to_string());
        assert_eq!(url.as_deref(), Some("postgres://specific/db"));
    }

    #[test]
    fn test_bad_env_value_is_rejected() {
        let mut config = AppConfig::new();
        assert!(config.apply_env_from(env(&[("PORT", "http")])).is_err());
        assert!(config.apply_env_from(env(&[("WORDVEC_STORE", "redis")])).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::new();
        config.database.table = "words; --".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::new();
        config.search.default_results_limit = 5000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::new();
        config.store.backend = StoreBackend::Memory;
        assert!(config.validate().is_err());
        config.store.vectors_file = Some(PathBuf::from("vectors.txt"));
        config.store.dimensions = Some(50);
        assert!(config.validate().is_ok());
    }
}
