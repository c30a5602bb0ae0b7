//! Storage layer for word embeddings.
//!
//! - **pgvector**: production backend; ranking and arithmetic run in SQL
//! - **memory**: exact in-process backend loaded from a vectors file
//!
//! Both implement [`EmbeddingStore`] for reads and [`EmbeddingSink`] for
//! the bulk loader.

// Distances are reported as f64 from f32 components.
#![allow(clippy::cast_precision_loss)]
// Pool connections are held for the whole query on purpose.
#![allow(clippy::significant_drop_tightening)]

pub mod memory;
pub mod migrations;
pub mod pgvector;
mod traits;

pub use memory::MemoryStore;
pub use pgvector::PgvectorStore;
pub use traits::{EmbeddingSink, EmbeddingStore};
