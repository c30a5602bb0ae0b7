//! Word embedding operations.
//!
//! [`WordService`] turns word-level requests into store queries: it applies
//! defaults and limits, builds the exclusion filter, deduplicates target
//! lists, and maps absent words to the right outcome.

use crate::config::SearchConfig;
use crate::models::{DistanceQuery, Measure, Metric, QueryVector, RankedQuery, ResultRow};
use crate::observability::{OPERATION_DURATION_MS, REQUESTS_TOTAL};
use crate::query::{ExclusionFilter, dedupe_preserving_order};
use crate::storage::EmbeddingStore;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Options for [`WordService::nearest_neighbours`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NeighbourOptions {
    /// Number of neighbours; defaults to `search.default_neighbours`.
    pub n: Option<usize>,
    /// Ranking metric; defaults to `search.default_metric`.
    pub metric: Option<Metric>,
}

/// Options for [`WordService::distances_to_words`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceOptions {
    /// Distance metric; defaults to `search.default_metric`.
    pub metric: Option<Metric>,
    /// Report `1 - cosine_distance`; defaults to true for cosine only.
    pub similarity: Option<bool>,
    /// Drop the query word from the targets; defaults to true.
    pub exclude_self: Option<bool>,
}

/// Options for [`WordService::vector_arithmetic`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ArithmeticOptions {
    /// Number of results; defaults to `search.default_results_limit`.
    pub limit: Option<usize>,
    /// Ranking metric; defaults to `search.default_metric`.
    pub metric: Option<Metric>,
    /// Include the distance column.
    pub include_distance: bool,
}

/// Service for embedding lookups, neighbour search and word arithmetic.
#[derive(Clone)]
pub struct WordService {
    store: Arc<dyn EmbeddingStore>,
    settings: SearchConfig,
}

impl WordService {
    /// Creates a service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn EmbeddingStore>, settings: SearchConfig) -> Self {
        Self { store, settings }
    }

    /// Returns the search settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &SearchConfig {
        &self.settings
    }

    /// Returns the stored embedding of `word`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WordNotFound`] if the word has no embedding, or
    /// [`Error::OperationFailed`] if the store fails.
    #[instrument(skip(self), fields(operation = "embedding"))]
    pub async fn get_embedding(&self, word: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let result = async {
            require_word(word)?;
            self.store
                .embedding(word)
                .await?
                .ok_or_else(|| Error::WordNotFound(word.to_string()))
        }
        .await;
        record("embedding", &result, start);
        result
    }

    /// Returns the nearest neighbours of `word`, closest first.
    ///
    /// Words containing `word` (as given or with its first letter
    /// capitalized) are left out. An unknown word yields no rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `n` is out of range.
    #[instrument(skip(self), fields(operation = "neighbours"))]
    pub async fn nearest_neighbours(
        &self,
        word: &str,
        options: NeighbourOptions,
    ) -> Result<Vec<ResultRow>> {
        let start = Instant::now();
        let result = async {
            require_word(word)?;
            let limit = self.limit("n", options.n, self.settings.default_neighbours)?;
            let query = RankedQuery {
                vector: QueryVector::word(word),
                metric: options.metric.unwrap_or(self.settings.default_metric),
                limit,
                exclusion: ExclusionFilter::from_words([word]),
                include_distance: true,
            };
            self.store.ranked_search(&query).await
        }
        .await;
        record("neighbours", &result, start);
        result
    }

    /// Returns the distance from `word` to each target, in first-seen order.
    ///
    /// Repeated targets are looked up once and unknown targets are dropped.
    /// An unknown query word yields no rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `targets` holds no words, or if
    /// similarity is requested for a non-cosine metric.
    #[instrument(skip(self, targets), fields(operation = "distances", targets = targets.len()))]
    pub async fn distances_to_words(
        &self,
        word: &str,
        targets: &[String],
        options: DistanceOptions,
    ) -> Result<Vec<ResultRow>> {
        let start = Instant::now();
        let result = async {
            require_word(word)?;
            let targets: Vec<String> = dedupe_preserving_order(targets)
                .into_iter()
                .filter(|target| !target.is_empty())
                .collect();
            if targets.is_empty() {
                return Err(Error::InvalidInput(
                    "words must contain at least one word".to_string(),
                ));
            }
            let metric = options.metric.unwrap_or(self.settings.default_metric);
            let query = DistanceQuery {
                word: word.to_string(),
                targets,
                measure: Measure::resolve(metric, options.similarity)?,
                exclude_self: options.exclude_self.unwrap_or(true),
            };
            self.store.distances(&query).await
        }
        .await;
        record("distances", &result, start);
        result
    }

    /// Returns the vocabulary entries closest to `sum(add) - sum(sub)`.
    ///
    /// Unknown input words contribute nothing. Every input word is excluded
    /// from the results with the same substring rule as neighbour search.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `limit` is out of range.
    #[instrument(skip(self, add, sub), fields(operation = "results", add = add.len(), sub = sub.len()))]
    pub async fn vector_arithmetic(
        &self,
        add: &[String],
        sub: &[String],
        options: ArithmeticOptions,
    ) -> Result<Vec<ResultRow>> {
        let start = Instant::now();
        let result = async {
            let limit = self.limit("limit", options.limit, self.settings.default_results_limit)?;
            let vector = composite(add, sub);
            let exclusion = ExclusionFilter::from_words(vector.input_words());
            let query = RankedQuery {
                vector,
                metric: options.metric.unwrap_or(self.settings.default_metric),
                limit,
                exclusion,
                include_distance: options.include_distance,
            };
            self.store.ranked_search(&query).await
        }
        .await;
        record("results", &result, start);
        result
    }

    /// Returns the composite vector `sum(add) - sum(sub)`.
    ///
    /// This is the zero vector when nothing resolves, and empty when the
    /// table holds no rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the store fails.
    #[instrument(skip(self, add, sub), fields(operation = "vector"))]
    pub async fn query_vector(&self, add: &[String], sub: &[String]) -> Result<Vec<f32>> {
        let start = Instant::now();
        let result = self
            .store
            .query_vector(&composite(add, sub))
            .await
            .map(Option::unwrap_or_default);
        record("vector", &result, start);
        result
    }

    /// Checks that the store answers.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the round-trip fails.
    pub async fn health(&self) -> Result<()> {
        self.store.health_check().await.inspect_err(|e| {
            tracing::warn!(backend = self.store.name(), error = %e, "Health check failed");
        })
    }

    fn limit(&self, name: &str, value: Option<usize>, default: usize) -> Result<usize> {
        let max = self.settings.max_limit;
        match value.unwrap_or(default) {
            n if (1..=max).contains(&n) => Ok(n),
            n => Err(Error::InvalidInput(format!(
                "{name} must be between 1 and {max}, got {n}"
            ))),
        }
    }
}

fn composite(add: &[String], sub: &[String]) -> QueryVector {
    QueryVector::composite(dedupe_preserving_order(add), dedupe_preserving_order(sub))
}

fn require_word(word: &str) -> Result<()> {
    if word.trim().is_empty() {
        return Err(Error::InvalidInput("word must not be empty".to_string()));
    }
    Ok(())
}

fn record<T>(operation: &'static str, result: &Result<T>, start: Instant) {
    let outcome = match result {
        Ok(_) => "success",
        Err(Error::WordNotFound(_)) => "not_found",
        Err(Error::InvalidInput(_)) => "invalid",
        Err(Error::OperationFailed { .. }) => "error",
    };
    metrics::counter!(REQUESTS_TOTAL, "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!(OPERATION_DURATION_MS, "operation" => operation)
        .record(start.elapsed().as_secs_f64() * 1000.0);
}
