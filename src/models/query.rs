//! Query vectors and the query records handed to an [`EmbeddingStore`].
//!
//! [`EmbeddingStore`]: crate::storage::EmbeddingStore

use super::{Measure, Metric};
use crate::query::ExclusionFilter;

/// The vector a search is run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryVector {
    /// The stored embedding of a single word.
    ///
    /// A word with no stored embedding yields no query vector, and the
    /// search that follows returns no rows.
    Word(String),
    /// `sum(add) - sum(sub)` over the stored embeddings of the listed words.
    ///
    /// Unknown words contribute nothing. Each stored word is counted at most
    /// once per side. When nothing resolves the result is the zero vector.
    Composite {
        /// Words whose embeddings are summed.
        add: Vec<String>,
        /// Words whose embeddings are subtracted.
        sub: Vec<String>,
    },
}

impl QueryVector {
    /// Creates a single-word query vector.
    #[must_use]
    pub fn word(word: impl Into<String>) -> Self {
        Self::Word(word.into())
    }

    /// Creates a composite query vector.
    #[must_use]
    pub fn composite(add: Vec<String>, sub: Vec<String>) -> Self {
        Self::Composite { add, sub }
    }

    /// Returns the input words this vector was built from.
    #[must_use]
    pub fn input_words(&self) -> Vec<&str> {
        match self {
            Self::Word(word) => vec![word.as_str()],
            Self::Composite { add, sub } => add.iter().chain(sub).map(String::as_str).collect(),
        }
    }

    /// Returns the number of SQL parameters the vector's CTE binds.
    #[must_use]
    pub const fn param_count(&self) -> usize {
        match self {
            Self::Word(_) => 1,
            Self::Composite { .. } => 2,
        }
    }
}

/// A ranked nearest-neighbour search.
#[derive(Debug, Clone)]
pub struct RankedQuery {
    /// The vector to rank against.
    pub vector: QueryVector,
    /// Metric used for ordering (and for the reported distance).
    pub metric: Metric,
    /// Maximum number of rows.
    pub limit: usize,
    /// Words removed from the candidate set.
    pub exclusion: ExclusionFilter,
    /// Whether rows carry their distance.
    pub include_distance: bool,
}

/// A positional distance evaluation against an explicit word list.
#[derive(Debug, Clone)]
pub struct DistanceQuery {
    /// The query word.
    pub word: String,
    /// Target words, already deduplicated, in caller order.
    pub targets: Vec<String>,
    /// What to report per target.
    pub measure: Measure,
    /// Drop the query word from the targets.
    pub exclude_self: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_words() {
        let single = QueryVector::word("cat");
        assert_eq!(single.input_words(), vec!["cat"]);

        let composite = QueryVector::composite(
            vec!["king".to_string(), "woman".to_string()],
            vec!["man".to_string()],
        );
        assert_eq!(composite.input_words(), vec!["king", "woman", "man"]);
    }

    #[test]
    fn test_param_count() {
        assert_eq!(QueryVector::word("a").param_count(), 1);
        assert_eq!(QueryVector::composite(vec![], vec![]).param_count(), 2);
    }
}
