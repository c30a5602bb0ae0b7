//! Business logic services.
//!
//! Services validate requests and orchestrate the embedding store.

mod words;

pub use words::{ArithmeticOptions, DistanceOptions, NeighbourOptions, WordService};
