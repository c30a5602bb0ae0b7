//! Bulk loading of word vectors.
//!
//! Reads GloVe-style text files (`word v1 v2 ... vd` per line) and writes
//! them to an [`EmbeddingSink`](crate::storage::EmbeddingSink) in batches.

mod glove;

pub use glove::{LoadOptions, LoadReport, load, load_file, parse_line};
