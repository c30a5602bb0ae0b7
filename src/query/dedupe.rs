//! Order-preserving deduplication of requested word lists.

use std::collections::HashSet;

/// Removes repeated words, keeping the first occurrence of each.
///
/// # Examples
///
/// ```
/// use wordvec::query::dedupe_preserving_order;
///
/// let words = ["cat", "cat", "bird", "cat"].map(String::from);
/// assert_eq!(dedupe_preserving_order(&words), vec!["cat", "bird"]);
/// ```
#[must_use]
pub fn dedupe_preserving_order<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(words.len());
    words
        .iter()
        .map(|word| word.as_ref())
        .filter(|word| seen.insert(*word))
        .map(String::from)
        .collect()
}
