//! Query-string binding.
//!
//! Parameters are collected as raw `(key, value)` pairs so that list
//! parameters can be given either comma-separated (`words=a,b`) or as
//! repeated keys (`words=a&words=b`). The `{word}` path segment is bound
//! by [`WordPath`] so that undecodable segments get the JSON error body too.

use crate::models::Metric;
use crate::{Error, Result};
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::request::Parts;

/// Raw query-string parameters in request order.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::InvalidInput(rejection.body_text()))?;
        Ok(Self { pairs })
    }
}

/// The percent-decoded `{word}` segment of the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPath(pub String);

impl<S> FromRequestParts<S> for WordPath
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Path(word) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::InvalidInput(rejection.body_text()))?;
        Ok(Self(word))
    }
}

impl QueryParams {
    /// Creates parameters from pairs.
    #[must_use]
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Returns true if `key` appears at all, even with an empty value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Returns the last value given for `key`.
    fn last(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Returns every item of a list parameter.
    ///
    /// Values are split on commas and trimmed; empty items are dropped.
    #[must_use]
    pub fn list(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .flat_map(|(_, v)| v.split(','))
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect()
    }

    /// Parses a count parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the value is not a non-negative
    /// integer.
    pub fn count(&self, key: &str) -> Result<Option<usize>> {
        self.last(key)
            .map(|value| {
                value.parse::<usize>().map_err(|_| {
                    Error::InvalidInput(format!("{key} must be a positive integer, got '{value}'"))
                })
            })
            .transpose()
    }

    /// Parses a boolean parameter (`true` / `false`, any case).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for any other value.
    pub fn flag(&self, key: &str) -> Result<Option<bool>> {
        self.last(key)
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::InvalidInput(format!(
                    "{key} must be true or false, got '{value}'"
                ))),
            })
            .transpose()
    }

    /// Parses the `metric` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown metric.
    pub fn metric(&self) -> Result<Option<Metric>> {
        self.last("metric").map(str::parse).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_list_accepts_commas_and_repeats() {
        let params = QueryParams::new([
            ("words", "cat, dog"),
            ("add", "king"),
            ("words", "bird,,"),
            ("words", ""),
        ]);
        assert_eq!(params.list("words"), vec!["cat", "dog", "bird"]);
        assert_eq!(params.list("add"), vec!["king"]);
        assert!(params.list("sub").is_empty());
    }

    #[test]
    fn test_contains_sees_empty_values() {
        let params = QueryParams::new([("words", "")]);
        assert!(params.contains("words"));
        assert!(!params.contains("add"));
    }

    #[test_case("5", Some(5); "number")]
    #[test_case(" 12 ", Some(12); "trimmed")]
    #[test_case("", None; "empty")]
    fn test_count(value: &str, expected: Option<usize>) {
        let params = QueryParams::new([("n", value)]);
        assert_eq!(params.count("n").unwrap(), expected);
    }

    #[test_case("-1"; "negative")]
    #[test_case("ten"; "word")]
    #[test_case("2.5"; "fraction")]
    fn test_count_rejects(value: &str) {
        let params = QueryParams::new([("n", value)]);
        assert!(matches!(params.count("n"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_last_value_wins() {
        let params = QueryParams::new([("limit", "3"), ("limit", "7")]);
        assert_eq!(params.count("limit").unwrap(), Some(7));
    }

    #[test_case("true", Some(true); "true")]
    #[test_case("FALSE", Some(false); "upper false")]
    #[test_case("True", Some(true); "mixed case")]
    fn test_flag(value: &str, expected: Option<bool>) {
        let params = QueryParams::new([("similarity", value)]);
        assert_eq!(params.flag("similarity").unwrap(), expected);
    }

    #[test]
    fn test_flag_rejects_other_values() {
        let params = QueryParams::new([("excludeSelf", "1")]);
        assert!(params.flag("excludeSelf").is_err());
        assert_eq!(QueryParams::default().flag("excludeSelf").unwrap(), None);
    }

    #[test]
    fn test_metric() {
        assert_eq!(
            QueryParams::new([("metric", "L2")]).metric().unwrap(),
            Some(Metric::L2)
        );
        assert!(QueryParams::new([("metric", "manhattan")]).metric().is_err());
        assert_eq!(QueryParams::default().metric().unwrap(), None);
    }
}
