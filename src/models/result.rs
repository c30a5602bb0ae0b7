//! Response rows.

use serde::{Deserialize, Serialize};

/// One row of a neighbour, arithmetic or distance response.
///
/// `distance` is only serialized when the query asked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// The vocabulary word.
    pub word: String,
    /// Distance (or similarity) to the query vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl ResultRow {
    /// Creates a row without a distance.
    #[must_use]
    pub fn word(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            distance: None,
        }
    }

    /// Creates a row with a distance.
    #[must_use]
    pub fn with_distance(word: impl Into<String>, distance: f64) -> Self {
        Self {
            word: word.into(),
            distance: Some(distance),
        }
    }
}
