//! Built-in rule templates.
//!
//! Every built-in produces exactly one row with a `check_name` and a numeric
//! `value` column, reading from the suite's base fragment
//! `cte_<suite_name>_base`. Count-style rules use portable SQL; `regex_match`
//! and `freshness` use warehouse functions (`REGEXP_CONTAINS`,
//! `TIMESTAMP_DIFF`).
//!
//! Rules that need configuration take it through their accessor, which stores
//! it as instance default parameters:
//!
//! ```rust
//! use sentinel_guard::rules::builtin;
//!
//! let rule = builtin::value_range(0.0, 100.0);
//! assert_eq!(rule.name(), "value_range");
//! assert_eq!(rule.params()["upper_bound"], serde_json::json!(100.0));
//! ```

use super::{RuleDefinition, RuleTemplate};
use crate::error::Result;
use crate::security::SqlSecurity;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

fn define(
    name: &str,
    description: &str,
    template: &str,
    required: &[&str],
) -> Arc<RuleDefinition> {
    Arc::new(
        RuleDefinition::new(name, description, template.trim())
            .with_required_params(required.iter().copied()),
    )
}

static NOT_NULL: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "not_null",
        "Counts NULL values in a column",
        r"
SELECT
    '{{ check_name }}' AS check_name,
    COALESCE(SUM(CASE WHEN {{ column_name }} IS NULL THEN 1 ELSE 0 END), 0) AS value
FROM cte_{{ suite_name }}_base
",
        &["column_name"],
    )
});

static UNIQUE: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "unique",
        "Counts duplicate values in a column",
        r"
SELECT
    '{{ check_name }}' AS check_name,
    COUNT(*) - COUNT(DISTINCT {{ column_name }}) AS value
FROM cte_{{ suite_name }}_base
",
        &["column_name"],
    )
});

static ROW_COUNT: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "row_count",
        "Counts total rows in the dataset",
        r"
SELECT
    '{{ check_name }}' AS check_name,
    COUNT(*) AS value
FROM cte_{{ suite_name }}_base
",
        &[],
    )
});

static NEGATIVE_VALUES: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "negative_values",
        "Counts negative values in a numeric column",
        r"
SELECT
    '{{ check_name }}' AS check_name,
    COALESCE(SUM(CASE WHEN {{ column_name }} < 0 THEN 1 ELSE 0 END), 0) AS value
FROM cte_{{ suite_name }}_base
",
        &["column_name"],
    )
});

static CONSTANT_COLUMN: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "constant_column",
        "Counts extra distinct values beyond the first",
        r"
SELECT
    '{{ check_name }}' AS check_name,
    COUNT(DISTINCT {{ column_name }}) - 1 AS value
FROM cte_{{ suite_name }}_base
",
        &["column_name"],
    )
});

static NULL_RATIO: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "null_ratio",
        "Computes the ratio of NULL values to total records",
        r"
SELECT
    '{{ check_name }}' AS check_name,
    SUM(CASE WHEN {{ column_name }} IS NULL THEN 1.0 ELSE 0.0 END) / NULLIF(COUNT(*), 0) AS value
FROM cte_{{ suite_name }}_base
",
        &["column_name"],
    )
});

static REGEX_MATCH: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "regex_match",
        "Counts values not matching a regex pattern",
        r"
SELECT
    '{{ check_name }}' AS check_name,
    COALESCE(SUM(CASE WHEN REGEXP_CONTAINS({{ column_name }}, r'{{ regex_pattern }}') THEN 0 ELSE 1 END), 0) AS value
FROM cte_{{ suite_name }}_base
",
        &["column_name", "regex_pattern"],
    )
});

static DUPLICATE_ROWS: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "duplicate_rows",
        "Counts duplicate rows based on a combination of key columns",
        r"
SELECT
    '{{ check_name }}' AS check_name,
    COUNT(*) - COUNT(DISTINCT CONCAT({% for column in column_names %}CAST({{ column }} AS STRING){% if not loop.last %}, '|', {% endif %}{% endfor %})) AS value
FROM cte_{{ suite_name }}_base
",
        &["column_names"],
    )
});

static FRESHNESS: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "freshness",
        "Time elapsed since the most recent record, in the configured granularity",
        r"
SELECT
    '{{ check_name }}' AS check_name,
    TIMESTAMP_DIFF(CURRENT_TIMESTAMP(), MAX({{ column_name }}), {{ granularity }}) AS value
FROM cte_{{ suite_name }}_base
",
        &["column_name", "granularity"],
    )
});

static REFERENTIAL_INTEGRITY: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "referential_integrity",
        "Counts rows whose value is not found in the reference table",
        r"
SELECT
    '{{ check_name }}' AS check_name,
    COUNT(*) AS value
FROM cte_{{ suite_name }}_base AS b
WHERE b.{{ column_name }} IS NOT NULL
  AND NOT EXISTS (
    SELECT 1 FROM {{ reference_table }} AS r
    WHERE r.{{ reference_column }} = b.{{ column_name }}
  )
",
        &["column_name", "reference_table", "reference_column"],
    )
});

static ACCEPTED_VALUES: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "accepted_values",
        "Counts values not in the accepted list",
        r#"
SELECT
    '{{ check_name }}' AS check_name,
    COALESCE(SUM(CASE WHEN {{ column_name }} NOT IN ({{ accepted_values | join(sep=", ") }}) THEN 1 ELSE 0 END), 0) AS value
FROM cte_{{ suite_name }}_base
"#,
        &["column_name", "accepted_values"],
    )
});

static VALUE_RANGE: Lazy<Arc<RuleDefinition>> = Lazy::new(|| {
    define(
        "value_range",
        "Counts values outside the configured range",
        r"
SELECT
    '{{ check_name }}' AS check_name,
    COALESCE(SUM(CASE WHEN {{ column_name }} < {{ lower_bound }} OR {{ column_name }} > {{ upper_bound }} THEN 1 ELSE 0 END), 0) AS value
FROM cte_{{ suite_name }}_base
",
        &["column_name", "lower_bound", "upper_bound"],
    )
});

/// Every built-in definition, in name order.
pub fn definitions() -> Vec<Arc<RuleDefinition>> {
    let mut all: Vec<Arc<RuleDefinition>> = [
        &*NOT_NULL,
        &*UNIQUE,
        &*ROW_COUNT,
        &*NEGATIVE_VALUES,
        &*CONSTANT_COLUMN,
        &*NULL_RATIO,
        &*REGEX_MATCH,
        &*DUPLICATE_ROWS,
        &*FRESHNESS,
        &*REFERENTIAL_INTEGRITY,
        &*ACCEPTED_VALUES,
        &*VALUE_RANGE,
    ]
    .into_iter()
    .map(|definition| Arc::clone(definition))
    .collect();
    all.sort_by(|a, b| a.name.cmp(&b.name));
    all
}

/// Counts NULL values in `column_name`.
pub fn not_null() -> RuleTemplate {
    RuleTemplate::new(Arc::clone(&*NOT_NULL))
}

/// Counts duplicate values in `column_name`.
pub fn unique() -> RuleTemplate {
    RuleTemplate::new(Arc::clone(&*UNIQUE))
}

/// Counts rows.
pub fn row_count() -> RuleTemplate {
    RuleTemplate::new(Arc::clone(&*ROW_COUNT))
}

/// Counts negative values in `column_name`.
pub fn negative_values() -> RuleTemplate {
    RuleTemplate::new(Arc::clone(&*NEGATIVE_VALUES))
}

/// Counts distinct values beyond the first in `column_name`.
pub fn constant_column() -> RuleTemplate {
    RuleTemplate::new(Arc::clone(&*CONSTANT_COLUMN))
}

/// Ratio of NULL values in `column_name`, between 0 and 1.
pub fn null_ratio() -> RuleTemplate {
    RuleTemplate::new(Arc::clone(&*NULL_RATIO))
}

/// Counts values of `column_name` not matching `pattern`.
///
/// # Errors
///
/// Returns a security error if the pattern does not compile or looks like a
/// catastrophic-backtracking pattern.
pub fn regex_match(pattern: &str) -> Result<RuleTemplate> {
    let escaped = SqlSecurity::validate_regex_pattern(pattern)?;
    Ok(RuleTemplate::new(Arc::clone(&*REGEX_MATCH)).with_param("regex_pattern", escaped))
}

/// Counts duplicate rows over the given key columns.
pub fn duplicate_rows<I, S>(columns: I) -> RuleTemplate
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let columns: Vec<Value> = columns
        .into_iter()
        .map(|c| Value::String(c.into()))
        .collect();
    RuleTemplate::new(Arc::clone(&*DUPLICATE_ROWS)).with_param("column_names", columns)
}

/// Time since the latest value of `column_name`.
pub fn freshness(granularity: FreshnessGranularity) -> RuleTemplate {
    RuleTemplate::new(Arc::clone(&*FRESHNESS)).with_param("granularity", granularity.as_str())
}

/// Counts values of `column_name` missing from `reference_table.reference_column`.
///
/// The reference table is inserted as written, so it must already carry any
/// quoting the engine requires.
pub fn referential_integrity(
    reference_table: impl Into<String>,
    reference_column: impl Into<String>,
) -> RuleTemplate {
    RuleTemplate::new(Arc::clone(&*REFERENTIAL_INTEGRITY))
        .with_param("reference_table", reference_table.into())
        .with_param("reference_column", reference_column.into())
}

/// Counts values of `column_name` outside `values`.
///
/// Strings become quoted SQL literals; numbers and booleans are written as-is.
pub fn accepted_values<I, V>(values: I) -> RuleTemplate
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let literals: Vec<Value> = values
        .into_iter()
        .map(|v| Value::String(SqlSecurity::sql_literal(&v.into())))
        .collect();
    RuleTemplate::new(Arc::clone(&*ACCEPTED_VALUES)).with_param("accepted_values", literals)
}

/// Counts values of `column_name` outside `[lower, upper]`.
pub fn value_range(lower: f64, upper: f64) -> RuleTemplate {
    RuleTemplate::new(Arc::clone(&*VALUE_RANGE))
        .with_param("lower_bound", lower)
        .with_param("upper_bound", upper)
}

/// Unit used by the [`freshness`] rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FreshnessGranularity {
    Microsecond,
    Millisecond,
    Second,
    Minute,
    #[default]
    Hour,
    Day,
}

impl FreshnessGranularity {
    /// SQL keyword for the unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Microsecond => "MICROSECOND",
            Self::Millisecond => "MILLISECOND",
            Self::Second => "SECOND",
            Self::Minute => "MINUTE",
            Self::Hour => "HOUR",
            Self::Day => "DAY",
        }
    }
}

impl fmt::Display for FreshnessGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
