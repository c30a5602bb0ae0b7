//! pgvector-based embedding store.
//!
//! Nearest-neighbour ranking, distance computation and vector arithmetic
//! all run inside PostgreSQL through pgvector operators. Vectors cross the
//! wire in pgvector's text form (`[0.1,0.2]`), so no client-side `vector`
//! type mapping is needed.

pub mod sql;

use crate::config::DatabaseConfig;
use crate::models::{
    DistanceQuery, Metric, QueryVector, RankedQuery, ResultRow, WordEmbedding, format_vector,
    parse_vector,
};
use crate::observability::STORE_QUERY_DURATION_MS;
use crate::storage::migrations::{Migration, SchemaMigrator};
use crate::storage::traits::{EmbeddingSink, EmbeddingStore};
use crate::{Error, Result};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tokio_postgres::NoTls;
use tokio_postgres::types::ToSql;

/// Embedded migrations compiled into the binary.
///
/// `{table}` and `{dimensions}` are substituted by the runner. Indexes are
/// not versioned here because their operator class depends on the metric;
/// see [`PgvectorStore::ensure_index`].
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Enable pgvector extension",
        sql: "CREATE EXTENSION IF NOT EXISTS vector",
    },
    Migration {
        version: 2,
        description: "Word embeddings table",
        sql: r"
            CREATE TABLE IF NOT EXISTS {table} (
                word TEXT PRIMARY KEY,
                embedding vector({dimensions}) NOT NULL
            )
        ",
    },
];

/// Helper to map pool errors.
fn pool_error(e: impl std::fmt::Display) -> Error {
    Error::operation("pgvector_get_client", e)
}

/// Helper to map query errors.
fn query_error(op: &str, e: impl std::fmt::Display) -> Error {
    Error::operation(op, e)
}

/// pgvector-based embedding store.
#[derive(Clone)]
pub struct PgvectorStore {
    /// Connection pool.
    pool: Pool,
    /// Table holding `(word, embedding)` rows.
    table: String,
    /// Whether the server's pgvector supports iterative HNSW scans.
    iterative_scan: Arc<OnceCell<bool>>,
}

impl PgvectorStore {
    /// Creates a store with a connection pool built from configuration.
    ///
    /// No connection is opened until the first query.
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is invalid, the connection URL
    /// cannot be parsed, or the pool fails to initialize.
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let cfg = Self::build_pool_config(config)?;
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| Error::operation("pgvector_create_pool", e))?;
        Self::from_pool(pool, config.table.clone())
    }

    /// Creates a store over an existing pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is invalid.
    pub fn from_pool(pool: Pool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        sql::validate_table_name(&table)?;
        Ok(Self {
            pool,
            table,
            iterative_scan: Arc::new(OnceCell::new()),
        })
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Builds a deadpool config from the database settings.
    ///
    /// A connection URL, when present, takes precedence over the discrete
    /// host/port/user fields.
    fn build_pool_config(config: &DatabaseConfig) -> Result<Config> {
        let mut cfg = Config::new();
        if let Some(url) = &config.url {
            let parsed = url
                .expose_secret()
                .parse::<tokio_postgres::Config>()
                .map_err(|e| Error::operation("pgvector_parse_url", e))?;
            cfg.host = parsed.get_hosts().first().map(Self::host_to_string);
            cfg.port = parsed.get_ports().first().copied();
            cfg.user = parsed.get_user().map(String::from);
            cfg.password = parsed
                .get_password()
                .map(|p| String::from_utf8_lossy(p).to_string());
            cfg.dbname = parsed.get_dbname().map(String::from);
        } else {
            cfg.host = Some(config.host.clone());
            cfg.port = Some(config.port);
            cfg.user = config.user.clone();
            cfg.password = config
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_string());
            cfg.dbname = Some(config.dbname.clone());
        }
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(config.pool_size));
        Ok(cfg)
    }

    /// Extracts host string from tokio-postgres Host.
    #[cfg(unix)]
    fn host_to_string(h: &tokio_postgres::config::Host) -> String {
        match h {
            tokio_postgres::config::Host::Tcp(s) => s.clone(),
            tokio_postgres::config::Host::Unix(p) => p.to_string_lossy().to_string(),
        }
    }

    /// Extracts host string from tokio-postgres Host (Windows: Tcp only).
    #[cfg(not(unix))]
    fn host_to_string(h: &tokio_postgres::config::Host) -> String {
        let tokio_postgres::config::Host::Tcp(s) = h;
        s.clone()
    }

    /// Creates the extension and table if needed, returning the schema
    /// version.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails, or if the table already
    /// exists with a different vector width.
    pub async fn run_migrations(&self, dimensions: usize) -> Result<i32> {
        let report = SchemaMigrator::new(&self.pool, &self.table, dimensions)
            .migrate(MIGRATIONS)
            .await?;
        if report.applied.is_empty() {
            tracing::info!(table = %self.table, version = report.current, "Schema up to date");
        }
        Ok(report.current)
    }

    /// Creates an HNSW index whose operator class matches `metric`.
    ///
    /// Searches only use the index when they are run with the same metric.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub async fn ensure_index(&self, metric: Metric) -> Result<()> {
        let client = self.pool.get().await.map_err(pool_error)?;
        let statement = sql::create_index(&self.table, metric);
        client
            .batch_execute(&statement)
            .await
            .map_err(|e| query_error("pgvector_create_index", e))?;
        tracing::info!(table = %self.table, metric = %metric, "Ensured HNSW index");
        Ok(())
    }

    /// Runs a query and records its latency.
    async fn query(
        &self,
        operation: &'static str,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>> {
        let client = self.pool.get().await.map_err(pool_error)?;
        tracing::debug!(operation, sql = statement, "Executing query");

        let start = Instant::now();
        let rows = client
            .query(statement, params)
            .await
            .map_err(|e| query_error(operation, e))?;

        metrics::histogram!(STORE_QUERY_DURATION_MS, "backend" => "pgvector", "operation" => operation)
            .record(start.elapsed().as_secs_f64() * 1000.0);
        Ok(rows)
    }

    /// Detects iterative scan support once per store.
    async fn supports_iterative_scan(&self) -> Result<bool> {
        self.iterative_scan
            .get_or_try_init(|| async {
                let client = self.pool.get().await.map_err(pool_error)?;
                let row = client
                    .query_one(sql::SUPPORTS_ITERATIVE_SCAN, &[])
                    .await
                    .map_err(|e| query_error("pgvector_detect_version", e))?;
                row.try_get::<_, bool>(0)
                    .map_err(|e| query_error("pgvector_detect_version", e))
            })
            .await
            .copied()
    }

    /// Runs a ranked search with HNSW settings sized for its filters.
    ///
    /// The settings are transaction-local, so pooled connections go back
    /// to the pool unchanged.
    async fn query_ranked(
        &self,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
        ef_search: usize,
    ) -> Result<Vec<tokio_postgres::Row>> {
        const OPERATION: &str = "pgvector_ranked_search";
        let iterative = self.supports_iterative_scan().await?;
        let mut client = self.pool.get().await.map_err(pool_error)?;
        tracing::debug!(operation = OPERATION, sql = statement, ef_search, iterative, "Executing query");

        let start = Instant::now();
        let tx = client
            .transaction()
            .await
            .map_err(|e| query_error(OPERATION, e))?;
        tx.execute(sql::SET_LOCAL, &[&"hnsw.ef_search", &ef_search.to_string()])
            .await
            .map_err(|e| query_error(OPERATION, e))?;
        if iterative {
            tx.execute(sql::SET_LOCAL, &[&"hnsw.iterative_scan", &"strict_order"])
                .await
                .map_err(|e| query_error(OPERATION, e))?;
        }
        let rows = tx
            .query(statement, params)
            .await
            .map_err(|e| query_error(OPERATION, e))?;
        tx.commit().await.map_err(|e| query_error(OPERATION, e))?;

        metrics::histogram!(STORE_QUERY_DURATION_MS, "backend" => "pgvector", "operation" => OPERATION)
            .record(start.elapsed().as_secs_f64() * 1000.0);
        Ok(rows)
    }

    /// Decodes a `(word, distance?)` row.
    fn decode_row(row: &tokio_postgres::Row, with_distance: bool) -> Result<ResultRow> {
        let word: String = row
            .try_get("word")
            .map_err(|e| query_error("pgvector_decode_word", e))?;
        if !with_distance {
            return Ok(ResultRow::word(word));
        }
        let distance: Option<f64> = row
            .try_get("distance")
            .map_err(|e| query_error("pgvector_decode_distance", e))?;
        Ok(ResultRow {
            word,
            distance: Some(distance.unwrap_or(f64::NAN)),
        })
    }
}

#[async_trait]
impl EmbeddingStore for PgvectorStore {
    fn name(&self) -> &'static str {
        "pgvector"
    }

    async fn embedding(&self, word: &str) -> Result<Option<Vec<f32>>> {
        let statement = sql::embedding_by_word(&self.table);
        let rows = self.query("pgvector_embedding", &statement, &[&word]).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let text: String = row
            .try_get("embedding")
            .map_err(|e| query_error("pgvector_decode_embedding", e))?;
        parse_vector(&text).map(Some)
    }

    async fn query_vector(&self, vector: &QueryVector) -> Result<Option<Vec<f32>>> {
        let statement = sql::query_vector(&self.table, vector);
        let rows = match vector {
            QueryVector::Word(word) => {
                self.query("pgvector_query_vector", &statement, &[word])
                    .await?
            },
            QueryVector::Composite { add, sub } => {
                self.query("pgvector_query_vector", &statement, &[add, sub])
                    .await?
            },
        };
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let text: Option<String> = row
            .try_get("qvec")
            .map_err(|e| query_error("pgvector_decode_qvec", e))?;
        text.as_deref().map(parse_vector).transpose()
    }

    async fn ranked_search(&self, query: &RankedQuery) -> Result<Vec<ResultRow>> {
        let statement = sql::ranked_search(&self.table, query);
        let patterns = query.exclusion.like_patterns();
        let limit = i64::try_from(query.limit)
            .map_err(|_| Error::InvalidInput(format!("limit {} is too large", query.limit)))?;

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(4);
        match &query.vector {
            QueryVector::Word(word) => params.push(word),
            QueryVector::Composite { add, sub } => {
                params.push(add);
                params.push(sub);
            },
        }
        params.push(&patterns);
        params.push(&limit);

        let ef_search = sql::hnsw_ef_search(query.limit, patterns.len());
        let rows = self.query_ranked(&statement, &params, ef_search).await?;
        rows.iter()
            .map(|row| Self::decode_row(row, query.include_distance))
            .collect()
    }

    async fn distances(&self, query: &DistanceQuery) -> Result<Vec<ResultRow>> {
        let statement = sql::distances(&self.table, query);
        let rows = self
            .query(
                "pgvector_distances",
                &statement,
                &[&query.word, &query.targets],
            )
            .await?;
        rows.iter().map(|row| Self::decode_row(row, true)).collect()
    }

    async fn health_check(&self) -> Result<()> {
        let client = self.pool.get().await.map_err(pool_error)?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| query_error("pgvector_health_check", e))?;
        Ok(())
    }
}

#[async_trait]
impl EmbeddingSink for PgvectorStore {
    async fn insert_batch(&self, batch: &[WordEmbedding]) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        let words: Vec<&str> = batch.iter().map(|e| e.word.as_str()).collect();
        let vectors: Vec<String> = batch.iter().map(|e| format_vector(&e.embedding)).collect();
        let statement = sql::insert_batch(&self.table);

        let mut client = self.pool.get().await.map_err(pool_error)?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| query_error("pgvector_insert_begin_tx", e))?;
        let inserted = tx
            .execute(&statement, &[&words, &vectors])
            .await
            .map_err(|e| query_error("pgvector_insert_batch", e))?;
        tx.commit()
            .await
            .map_err(|e| query_error("pgvector_insert_commit", e))?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn database_config() -> DatabaseConfig {
        DatabaseConfig {
            url: None,
            host: "db.internal".to_string(),
            port: 6543,
            user: Some("reader".to_string()),
            password: Some(SecretString::from("hunter2".to_string())),
            dbname: "vectors".to_string(),
            table: "word_embeddings".to_string(),
            pool_size: 4,
        }
    }

    #[test]
    fn test_pool_config_from_fields() {
        let cfg = PgvectorStore::build_pool_config(&database_config()).unwrap();
        assert_eq!(cfg.host.as_deref(), Some("db.internal"));
        assert_eq!(cfg.port, Some(6543));
        assert_eq!(cfg.user.as_deref(), Some("reader"));
        assert_eq!(cfg.password.as_deref(), Some("hunter2"));
        assert_eq!(cfg.dbname.as_deref(), Some("vectors"));
        assert_eq!(cfg.pool.map(|p| p.max_size), Some(4));
    }

    #[test]
    fn test_pool_config_url_takes_precedence() {
        let mut config = database_config();
        config.url = Some(SecretString::from("postgres://alice:pw@pg.example:5432/glove".to_string()));
        let cfg = PgvectorStore::build_pool_config(&config).unwrap();
        assert_eq!(cfg.host.as_deref(), Some("pg.example"));
        assert_eq!(cfg.port, Some(5432));
        assert_eq!(cfg.user.as_deref(), Some("alice"));
        assert_eq!(cfg.password.as_deref(), Some("pw"));
        assert_eq!(cfg.dbname.as_deref(), Some("glove"));
    }

    #[test]
    fn test_bad_url_is_rejected() {
        let mut config = database_config();
        config.url = Some(SecretString::from("postgres://user@host:notaport/db".to_string()));
        assert!(PgvectorStore::build_pool_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_invalid_table_name_is_rejected() {
        let mut config = database_config();
        config.table = "words; DROP TABLE users".to_string();
        assert!(matches!(PgvectorStore::new(&config), Err(Error::InvalidInput(_))));
    }
}
