//! Embedding store traits.
//!
//! The store is a read-only consumer of a `word -> embedding` table and
//! owns all distance computation. Two implementations exist:
//!
//! | Backend | Use Case | Configuration |
//! |---------|----------|---------------|
//! | `PgvectorStore` | Production: ranking runs in PostgreSQL via pgvector operators | `store.backend = "postgres"` |
//! | `MemoryStore` | Local runs and tests: exact brute-force scan | `store.backend = "memory"` + `store.vectors_file` |
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use wordvec::models::{Metric, QueryVector, RankedQuery};
//! use wordvec::query::ExclusionFilter;
//!
//! let rows = store
//!     .ranked_search(&RankedQuery {
//!         vector: QueryVector::word("cat"),
//!         metric: Metric::Cosine,
//!         limit: 10,
//!         exclusion: ExclusionFilter::from_words(["cat"]),
//!         include_distance: true,
//!     })
//!     .await?;
//! ```

use crate::Result;
use crate::models::{DistanceQuery, QueryVector, RankedQuery, ResultRow, WordEmbedding};
use async_trait::async_trait;

/// Read access to a table of word embeddings.
///
/// Implementations must be thread-safe (`Send + Sync`) so one store can be
/// shared by every request handler.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Returns the stored embedding for an exact (case-sensitive) word.
    ///
    /// Returns `Ok(None)` when no row matches.
    async fn embedding(&self, word: &str) -> Result<Option<Vec<f32>>>;

    /// Resolves a query vector.
    ///
    /// A single word resolves to its embedding (`None` when absent). A
    /// composite resolves to `sum(add) - sum(sub)`, which is the zero vector
    /// when nothing matches; it is `None` only when the table is empty.
    async fn query_vector(&self, vector: &QueryVector) -> Result<Option<Vec<f32>>>;

    /// Returns up to `limit` vocabulary entries ordered ascending by the
    /// metric's distance to the query vector.
    ///
    /// Entries matched by the exclusion filter are skipped, and so is the
    /// query word itself for single-word vectors. Tie order is unspecified.
    async fn ranked_search(&self, query: &RankedQuery) -> Result<Vec<ResultRow>>;

    /// Returns one row per target word that has a stored embedding, in
    /// target order. Returns no rows when the query word is absent.
    async fn distances(&self, query: &DistanceQuery) -> Result<Vec<ResultRow>>;

    /// Performs a trivial round-trip to the backing store.
    async fn health_check(&self) -> Result<()>;
}

/// Write access used by the vectors-file loader.
#[async_trait]
pub trait EmbeddingSink: Send + Sync {
    /// Inserts a batch, skipping words that already exist.
    ///
    /// Returns the number of rows actually inserted.
    async fn insert_batch(&self, batch: &[WordEmbedding]) -> Result<u64>;
}
