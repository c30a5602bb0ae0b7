//! SQL text for the pgvector backend.
//!
//! Every caller-supplied value is a numbered parameter. The only text
//! interpolated into SQL is the validated table name, operators taken from
//! [`Metric`], and fixed fragments.
//!
//! Parameter layout:
//!
//! | Query | Parameters |
//! |-------|------------|
//! | query vector, single word | `$1` word |
//! | query vector, composite | `$1` add words, `$2` sub words |
//! | ranked search | query-vector params, then exclusion patterns, then limit |
//! | distances | `$1` query word, `$2` target words |
//! | insert batch | `$1` words, `$2` vectors in text form |

use crate::models::{DistanceQuery, Measure, Metric, QueryVector, RankedQuery};
use crate::{Error, Result};

/// Validates a table name for interpolation into SQL.
///
/// Accepts `name` or `schema.name`, where each part starts with a letter or
/// underscore and continues with letters, digits or underscores.
pub fn validate_table_name(name: &str) -> Result<()> {
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            && part.len() <= 63
    };

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() <= 2 && parts.iter().all(|p| valid_part(p)) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid table name '{name}'")))
    }
}

/// Returns the unqualified part of a table name, for deriving index names.
#[must_use]
pub fn unqualified(table: &str) -> &str {
    table.rsplit('.').next().unwrap_or(table)
}

/// Selects one word's embedding in pgvector text form.
#[must_use]
pub fn embedding_by_word(table: &str) -> String {
    format!(
        r"SELECT embedding::text AS embedding
        FROM {table}
        WHERE word = $1
        LIMIT 1"
    )
}

/// Renders the `WITH` clause that defines CTE `q(qvec)`.
///
/// The composite form sums each side with aggregate filters and falls back
/// to a zero vector (`embedding - embedding` of any row) when neither side
/// resolves.
#[must_use]
pub fn query_vector_cte(table: &str, vector: &QueryVector) -> String {
    match vector {
        QueryVector::Word(_) => format!(
            r"WITH q AS (
            SELECT embedding AS qvec
            FROM {table}
            WHERE word = $1
        )"
        ),
        QueryVector::Composite { .. } => format!(
            r"WITH sums AS (
            SELECT
                SUM(e.embedding) FILTER (WHERE e.word = ANY($1::text[])) AS add_sum,
                SUM(e.embedding) FILTER (WHERE e.word = ANY($2::text[])) AS sub_sum
            FROM {table} AS e
            WHERE e.word = ANY($1::text[]) OR e.word = ANY($2::text[])
        ),
        q AS (
            SELECT COALESCE(
                COALESCE(add_sum, sub_sum - sub_sum) - COALESCE(sub_sum, add_sum - add_sum),
                (SELECT z.embedding - z.embedding FROM {table} AS z LIMIT 1)
            ) AS qvec
            FROM sums
        )"
        ),
    }
}

/// Selects the resolved query vector in pgvector text form.
#[must_use]
pub fn query_vector(table: &str, vector: &QueryVector) -> String {
    format!(
        "{}\n        SELECT qvec::text AS qvec FROM q",
        query_vector_cte(table, vector)
    )
}

/// Renders a ranked nearest-neighbour search.
#[must_use]
pub fn ranked_search(table: &str, query: &RankedQuery) -> String {
    let cte = query_vector_cte(table, &query.vector);
    let op = query.metric.operator();
    let exclusion_param = query.vector.param_count() + 1;
    let limit_param = exclusion_param + 1;

    let distance_column = if query.include_distance {
        format!(",\n               (w.embedding {op} (SELECT qvec FROM q))::float8 AS distance")
    } else {
        String::new()
    };
    let self_clause = match query.vector {
        QueryVector::Word(_) => "\n          AND w.word <> $1",
        QueryVector::Composite { .. } => "",
    };

    format!(
        r"{cte}
        SELECT w.word{distance_column}
        FROM {table} AS w
        WHERE EXISTS (SELECT 1 FROM q WHERE qvec IS NOT NULL){self_clause}
          AND w.word NOT LIKE ALL (${exclusion_param}::text[])
        ORDER BY w.embedding {op} (SELECT qvec FROM q)
        LIMIT ${limit_param}::bigint"
    )
}

/// Smallest and largest values pgvector accepts for `hnsw.ef_search`.
const EF_SEARCH_RANGE: (usize, usize) = (40, 1000);

/// Extra HNSW candidates reserved per exclusion pattern.
const EXCLUSION_SLACK: usize = 25;

/// Candidate-list size for an HNSW scan feeding a filtered `LIMIT`.
///
/// The index returns at most `hnsw.ef_search` rows and the `WHERE` clause
/// is applied to those afterwards, so the list must cover the limit, the
/// query word itself and whatever the exclusion patterns remove.
#[must_use]
pub fn hnsw_ef_search(limit: usize, exclusion_patterns: usize) -> usize {
    let (floor, ceiling) = EF_SEARCH_RANGE;
    limit
        .saturating_add(1)
        .saturating_add(exclusion_patterns.saturating_mul(EXCLUSION_SLACK))
        .clamp(floor, ceiling)
}

/// Sets a transaction-local planner setting from a bound value.
pub const SET_LOCAL: &str = "SELECT set_config($1, $2, true)";

/// Returns whether the installed pgvector supports iterative index scans
/// (0.8 and later).
pub const SUPPORTS_ITERATIVE_SCAN: &str = r"SELECT COALESCE(
            (SELECT string_to_array(extversion, '.')::int[] >= ARRAY[0, 8]
             FROM pg_extension WHERE extname = 'vector'),
            false
        )";

/// Renders the measure expression for a distance query.
#[must_use]
pub fn measure_expression(measure: Measure) -> String {
    match measure {
        Measure::CosineSimilarity => format!("1 - (w.embedding {} q.qvec)", Metric::Cosine.operator()),
        Measure::Distance(metric) => format!("w.embedding {} q.qvec", metric.operator()),
    }
}

/// Renders a positional distance evaluation over an explicit target list.
#[must_use]
pub fn distances(table: &str, query: &DistanceQuery) -> String {
    let measure = measure_expression(query.measure);
    let self_clause = if query.exclude_self {
        "\n        WHERE t.word <> $1"
    } else {
        ""
    };

    format!(
        r"WITH q AS (
            SELECT embedding AS qvec
            FROM {table}
            WHERE word = $1
        )
        SELECT t.word AS word,
               ({measure})::float8 AS distance
        FROM q
        JOIN unnest($2::text[]) WITH ORDINALITY AS t(word, ord) ON true
        JOIN {table} AS w
          ON w.word = t.word{self_clause}
        ORDER BY t.ord"
    )
}

/// Renders a batch insert that skips existing words.
#[must_use]
pub fn insert_batch(table: &str) -> String {
    format!(
        r"INSERT INTO {table} (word, embedding)
        SELECT u.word, u.embedding::vector
        FROM unnest($1::text[], $2::text[]) AS u(word, embedding)
        ON CONFLICT (word) DO NOTHING"
    )
}

/// Renders an HNSW index whose operator class matches the metric.
#[must_use]
pub fn create_index(table: &str, metric: Metric) -> String {
    format!(
        r"CREATE INDEX IF NOT EXISTS {base}_embedding_{metric}_idx
        ON {table} USING hnsw (embedding {class})",
        base = unqualified(table),
        metric = metric.as_str(),
        class = metric.operator_class(),
    )
}
