//! Data models.
//!
//! Core types:
//! - [`WordEmbedding`]: a stored word and its vector
//! - [`Metric`] / [`Measure`]: how distances are computed and reported
//! - [`QueryVector`]: the vector a search runs against
//! - [`RankedQuery`] / [`DistanceQuery`]: statically typed store queries
//! - [`ResultRow`]: the public response shape

mod embedding;
mod metric;
mod query;
mod result;

pub use embedding::{WordEmbedding, format_vector, parse_vector};
pub use metric::{Measure, Metric};
pub use query::{DistanceQuery, QueryVector, RankedQuery};
pub use result::ResultRow;
