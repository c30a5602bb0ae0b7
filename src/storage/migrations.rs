//! Versioned schema setup for an embeddings table.
//!
//! Each table gets a `{table}_schema_migrations` companion recording the
//! versions applied to it. Creating the companion and every migration each
//! run in their own transaction that first takes a transaction-scoped
//! advisory lock keyed on the companion's name, so replicas starting together
//! never race on `CREATE TABLE` and apply each version exactly once.
//!
//! After migrating, the width of the `embedding` column is compared with the
//! requested dimensionality: a table created for 300-d vectors is never
//! silently reused for 50-d ones.

use crate::{Error, Result};
use deadpool_postgres::{Pool, Transaction};
use tokio_postgres::Row;

/// Transaction-scoped advisory lock keyed on the version table's name.
const LOCK: &str = "SELECT pg_advisory_xact_lock(hashtext($1))";

/// One schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Sequential version, starting at 1.
    pub version: i32,
    /// Recorded next to the version.
    pub description: &'static str,
    /// Statements with `{table}` and `{dimensions}` placeholders.
    pub sql: &'static str,
}

impl Migration {
    /// Substitutes the placeholders.
    #[must_use]
    pub fn render(&self, table: &str, dimensions: usize) -> String {
        self.sql
            .replace("{table}", table)
            .replace("{dimensions}", &dimensions.to_string())
    }
}

/// Migrations newer than `current`, lowest version first.
#[must_use]
pub fn pending(migrations: &[Migration], current: i32) -> Vec<&Migration> {
    let mut pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| m.version > current)
        .collect();
    pending.sort_by_key(|m| m.version);
    pending
}

/// What a [`SchemaMigrator::migrate`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version before the call.
    pub previous: i32,
    /// Version after the call.
    pub current: i32,
    /// Versions applied by this call, in order.
    pub applied: Vec<i32>,
}

/// Applies [`Migration`]s to one embeddings table.
pub struct SchemaMigrator<'a> {
    pool: &'a Pool,
    table: &'a str,
    dimensions: usize,
}

impl<'a> SchemaMigrator<'a> {
    /// Creates a migrator. `table` must already be validated.
    #[must_use]
    pub const fn new(pool: &'a Pool, table: &'a str, dimensions: usize) -> Self {
        Self {
            pool,
            table,
            dimensions,
        }
    }

    fn version_table(&self) -> String {
        format!("{}_schema_migrations", self.table)
    }

    fn version_query(&self) -> String {
        format!("SELECT COALESCE(MAX(version), 0) FROM {}", self.version_table())
    }

    fn create_version_table(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            self.version_table()
        )
    }

    /// Blocks until no other migrator holds this table's lock; released on
    /// commit or rollback.
    async fn lock(&self, tx: &Transaction<'_>) -> std::result::Result<(), tokio_postgres::Error> {
        tx.execute(LOCK, &[&self.version_table()]).await.map(|_| ())
    }

    /// Brings the table up to the newest migration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if a statement fails (the failing
    /// migration is rolled back, earlier ones stay applied), or
    /// [`Error::InvalidInput`] if the existing column has another width.
    pub async fn migrate(&self, migrations: &[Migration]) -> Result<MigrationReport> {
        let mut client = self
            .pool
            .get()
            .await
            .map_err(|e| Error::operation("migration_connection", e))?;

        let setup = |e: tokio_postgres::Error| Error::operation("migration_version_table", e);
        let tx = client.transaction().await.map_err(setup)?;
        self.lock(&tx).await.map_err(setup)?;
        tx.batch_execute(&self.create_version_table())
            .await
            .map_err(setup)?;
        tx.commit().await.map_err(setup)?;

        let version_query = self.version_query();
        let previous = read_version(
            &client
                .query_one(&version_query, &[])
                .await
                .map_err(|e| Error::operation("migration_read_version", e))?,
        )?;

        let mut applied = Vec::new();
        for migration in pending(migrations, previous) {
            let step = |e: tokio_postgres::Error| {
                Error::operation(
                    format!("migration_v{} ({})", migration.version, migration.description),
                    e,
                )
            };

            let tx = client.transaction().await.map_err(step)?;
            self.lock(&tx).await.map_err(step)?;
            // Another migrator may have applied it while we waited on the lock.
            if read_version(&tx.query_one(&version_query, &[]).await.map_err(step)?)?
                >= migration.version
            {
                continue;
            }

            tx.batch_execute(&migration.render(self.table, self.dimensions))
                .await
                .map_err(step)?;
            tx.execute(
                &format!(
                    "INSERT INTO {} (version, description) VALUES ($1, $2)",
                    self.version_table()
                ),
                &[&migration.version, &migration.description],
            )
            .await
            .map_err(step)?;
            tx.commit().await.map_err(step)?;

            tracing::info!(
                table = self.table,
                version = migration.version,
                description = migration.description,
                "Applied migration"
            );
            applied.push(migration.version);
        }

        let current = read_version(
            &client
                .query_one(&version_query, &[])
                .await
                .map_err(|e| Error::operation("migration_read_version", e))?,
        )?;
        self.check_width(&client).await?;

        Ok(MigrationReport {
            previous,
            current,
            applied,
        })
    }

    /// Compares the `embedding` column's declared width with `dimensions`.
    async fn check_width(&self, client: &deadpool_postgres::Object) -> Result<()> {
        let row = client
            .query_opt(
                "SELECT atttypmod FROM pg_attribute
                 WHERE attrelid = to_regclass($1::text) AND attname = 'embedding'",
                &[&self.table],
            )
            .await
            .map_err(|e| Error::operation("migration_column_width", e))?;
        let Some(row) = row else {
            return Ok(());
        };
        let width: i32 = row
            .try_get(0)
            .map_err(|e| Error::operation("migration_column_width", e))?;
        width_matches(self.table, width, self.dimensions)
    }
}

fn read_version(row: &Row) -> Result<i32> {
    row.try_get(0)
        .map_err(|e| Error::operation("migration_read_version", e))
}

/// An unconstrained `vector` column reports a negative width and accepts
/// any dimensionality.
fn width_matches(table: &str, width: i32, dimensions: usize) -> Result<()> {
    match usize::try_from(width) {
        Ok(width) if width != dimensions => Err(Error::InvalidInput(format!(
            "{table}.embedding holds {width}-dimensional vectors, not {dimensions}"
        ))),
        _ => Ok(()),
    }
}
