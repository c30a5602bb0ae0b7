//! Word embeddings and the pgvector text representation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A stored word and its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEmbedding {
    /// The word (unique key, matched case-sensitively).
    pub word: String,
    /// The embedding vector.
    pub embedding: Vec<f32>,
}

impl WordEmbedding {
    /// Creates a new word embedding.
    #[must_use]
    pub fn new(word: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            word: word.into(),
            embedding,
        }
    }

    /// Returns the dimensionality of the embedding.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

/// Parses pgvector's text form (`[0.1,0.2,0.3]`) into a vector.
///
/// Surrounding whitespace and the enclosing brackets are stripped; each
/// comma-separated token is parsed as a float, preserving order. `[]`
/// parses to an empty vector.
///
/// # Examples
///
/// ```
/// use wordvec::models::parse_vector;
///
/// assert_eq!(parse_vector("[0.5, -1, 2e-1]").unwrap(), vec![0.5, -1.0, 0.2]);
/// ```
pub fn parse_vector(text: &str) -> Result<Vec<f32>> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| Error::operation("parse_vector", format!("not a bracketed vector: {trimmed}")))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<f32>()
                .map_err(|e| Error::operation("parse_vector", format!("'{token}': {e}")))
        })
        .collect()
}

/// Formats a vector in pgvector's text form: `[1,2.5,3]`.
#[must_use]
pub fn format_vector(vector: &[f32]) -> String {
    let values: Vec<String> = vector.iter().map(ToString::to_string).collect();
    format!("[{}]", values.join(","))
}
