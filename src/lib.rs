//! # wordvec
//!
//! HTTP API over a table of word embeddings stored in PostgreSQL with the
//! pgvector extension.
//!
//! The service answers four kinds of questions about a vocabulary:
//!
//! - the raw embedding of a word,
//! - the nearest neighbours of a word,
//! - the distances from one word to an explicit list of words,
//! - the nearest neighbours of `sum(add) - sum(sub)` (word analogies).
//!
//! Nearest-neighbour ranking and vector arithmetic run inside the database
//! through pgvector operators. This crate builds the queries, binds every
//! caller-supplied value as a parameter, and shapes rows into responses.
//! An in-process [`storage::MemoryStore`] implements the same contract for
//! local use and tests.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wordvec::config::SearchConfig;
//! use wordvec::services::{ArithmeticOptions, WordService};
//! use wordvec::storage::MemoryStore;
//!
//! let store = MemoryStore::from_pairs(2, [("king", vec![1.0, 0.0]), ("queen", vec![0.0, 1.0])])?;
//! let service = WordService::new(Arc::new(store), SearchConfig::default());
//! let rows = service.vector_arithmetic(&["king".into()], &[], ArithmeticOptions::default()).await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod http;
pub mod ingest;
pub mod models;
pub mod observability;
pub mod query;
pub mod services;
pub mod storage;

pub use config::AppConfig;
pub use models::{Metric, QueryVector, ResultRow, WordEmbedding};
pub use services::WordService;
pub use storage::EmbeddingStore;

/// Error type for wordvec operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When | HTTP status |
/// |---------|-------------|-------------|
/// | `InvalidInput` | Malformed query parameters, unknown metric, bad config values | 400 |
/// | `WordNotFound` | The single-embedding lookup finds no row for the word | 404 |
/// | `OperationFailed` | Pool, query, decoding or I/O failures | 500 |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - `n` or `limit` is not a positive integer within the configured maximum
    /// - `words` is missing or empty on a distance request
    /// - `metric` is not one of `cosine`, `l2`, `ip`
    /// - similarity output is requested for a non-cosine metric
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested word has no stored embedding.
    #[error("Word \"{0}\" not found")]
    WordNotFound(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - the connection pool cannot hand out a client
    /// - a query fails or returns an unexpected row shape
    /// - a stored vector cannot be parsed
    /// - a vectors file cannot be read
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from an operation name and a cause.
    pub fn operation(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for wordvec operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::WordNotFound("zyzzyva".to_string());
        assert_eq!(err.to_string(), "Word \"zyzzyva\" not found");

        let err = Error::operation("pgvector_search", "connection reset");
        assert_eq!(
            err.to_string(),
            "operation 'pgvector_search' failed: connection reset"
        );
    }
}
