//! Fuzzy exclusion of input words from neighbour results.
//!
//! Every input word produces two substring patterns: the word as given and
//! the word with its first character uppercased. A candidate is excluded
//! when it contains either pattern. This removes casing near-duplicates
//! (`cat` → `Cat`, `cats`) but also unrelated words that happen to contain
//! the input (`cat` → `catalog`), and it misses other casings (`CAT`).
//!
//! The SQL backend receives the patterns as a bound `text[]` parameter,
//! with LIKE metacharacters escaped so input words always match literally.

/// Escapes SQL LIKE wildcards in a string to make them literal.
///
/// `%` and `_` are wildcards and `\` is PostgreSQL's default LIKE escape
/// character, so all three are prefixed with a backslash.
///
/// # Examples
///
/// ```
/// use wordvec::query::escape_like_wildcards;
///
/// assert_eq!(escape_like_wildcards("100%"), "100\\%");
/// assert_eq!(escape_like_wildcards("new_york"), "new\\_york");
/// ```
#[must_use]
pub fn escape_like_wildcards(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            },
            _ => result.push(c),
        }
    }
    result
}

/// Uppercases the first character of a word, leaving the rest untouched.
#[must_use]
pub fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Set of input words to keep out of a ranked search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionFilter {
    /// Substring variants, deduplicated, in input order.
    variants: Vec<String>,
}

impl ExclusionFilter {
    /// Creates a filter that excludes nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            variants: Vec::new(),
        }
    }

    /// Creates a filter from input words.
    ///
    /// Empty words are ignored; an empty pattern would exclude the whole
    /// vocabulary.
    #[must_use]
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut variants: Vec<String> = Vec::new();
        for word in words {
            let word = word.as_ref();
            if word.is_empty() {
                continue;
            }
            for variant in [word.to_string(), capitalize_first(word)] {
                if !variants.contains(&variant) {
                    variants.push(variant);
                }
            }
        }
        Self { variants }
    }

    /// Returns `true` when the filter excludes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Returns the substring variants.
    #[must_use]
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Returns escaped `%variant%` LIKE patterns for a `NOT LIKE ALL` clause.
    #[must_use]
    pub fn like_patterns(&self) -> Vec<String> {
        self.variants
            .iter()
            .map(|v| format!("%{}%", escape_like_wildcards(v)))
            .collect()
    }

    /// Returns `true` when the candidate contains any variant.
    #[must_use]
    pub fn excludes(&self, candidate: &str) -> bool {
        self.variants.iter().any(|v| candidate.contains(v.as_str()))
    }
}
