//! Distance metrics and the measures reported for them.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Vector distance metric.
///
/// Each metric maps to one pgvector operator and one index operator class.
/// Queries only use an accelerated index path when the metric matches the
/// operator class the table's index was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Euclidean distance (`<->`).
    L2,
    /// Cosine distance (`<=>`).
    #[default]
    Cosine,
    /// Negative inner product (`<#>`).
    Ip,
}

impl Metric {
    /// All metrics, in declaration order.
    pub const ALL: [Self; 3] = [Self::L2, Self::Cosine, Self::Ip];

    /// Returns the metric as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::L2 => "l2",
            Self::Cosine => "cosine",
            Self::Ip => "ip",
        }
    }

    /// Returns the pgvector distance operator.
    #[must_use]
    pub const fn operator(&self) -> &'static str {
        match self {
            Self::L2 => "<->",
            Self::Cosine => "<=>",
            Self::Ip => "<#>",
        }
    }

    /// Returns the pgvector index operator class matching this metric.
    #[must_use]
    pub const fn operator_class(&self) -> &'static str {
        match self {
            Self::L2 => "vector_l2_ops",
            Self::Cosine => "vector_cosine_ops",
            Self::Ip => "vector_ip_ops",
        }
    }

    /// Computes the distance between two vectors the way the pgvector
    /// operator does.
    ///
    /// Cosine distance against a zero vector is `NaN`, as in pgvector.
    /// Vectors of different lengths are compared over their common prefix;
    /// callers are expected to keep dimensions consistent.
    #[must_use]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            Self::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = f64::from(*x) - f64::from(*y);
                    d * d
                })
                .sum::<f64>()
                .sqrt(),
            Self::Cosine => {
                let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
                for (x, y) in a.iter().zip(b) {
                    let (x, y) = (f64::from(*x), f64::from(*y));
                    dot += x * y;
                    norm_a += x * x;
                    norm_b += y * y;
                }
                let similarity = (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0);
                1.0 - similarity
            },
            Self::Ip => -a
                .iter()
                .zip(b)
                .map(|(x, y)| f64::from(*x) * f64::from(*y))
                .sum::<f64>(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "l2" => Ok(Self::L2),
            "cosine" => Ok(Self::Cosine),
            "ip" => Ok(Self::Ip),
            other => Err(Error::InvalidInput(format!(
                "unknown metric '{other}' (expected one of: cosine, l2, ip)"
            ))),
        }
    }
}

/// The value reported in the `distance` field of a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    /// The raw operator output for the metric.
    Distance(Metric),
    /// `1 - cosine_distance`.
    CosineSimilarity,
}

impl Measure {
    /// Resolves the measure for a metric and an optional similarity request.
    ///
    /// Without an explicit request, cosine reports similarity and the other
    /// metrics report their raw distance. Similarity is only defined for
    /// cosine; asking for it under `l2` or `ip` is rejected.
    pub fn resolve(metric: Metric, similarity: Option<bool>) -> Result<Self> {
        match (metric, similarity) {
            (Metric::Cosine, None | Some(true)) => Ok(Self::CosineSimilarity),
            (metric, None | Some(false)) => Ok(Self::Distance(metric)),
            (metric, Some(true)) => Err(Error::InvalidInput(format!(
                "similarity is only defined for the cosine metric, not '{metric}'"
            ))),
        }
    }

    /// Returns the metric whose operator drives this measure.
    #[must_use]
    pub const fn metric(&self) -> Metric {
        match self {
            Self::Distance(metric) => *metric,
            Self::CosineSimilarity => Metric::Cosine,
        }
    }

    /// Computes the measure between two vectors.
    #[must_use]
    pub fn compute(&self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            Self::Distance(metric) => metric.distance(a, b),
            Self::CosineSimilarity => 1.0 - Metric::Cosine.distance(a, b),
        }
    }
}
