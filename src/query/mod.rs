//! Result shaping: exclusion of input words and deduplication of targets.

mod dedupe;
mod exclusion;

pub use dedupe::dedupe_preserving_order;
pub use exclusion::{ExclusionFilter, capitalize_first, escape_like_wildcards};
