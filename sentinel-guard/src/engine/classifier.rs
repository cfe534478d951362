//! Maps output rows back to checks and classifies them against thresholds.

use super::Row;
use crate::core::{CheckResult, CheckStatus, Suite};
use crate::log_row;
use crate::logging::LogConfig;
use serde_json::Value;
use tracing::warn;

/// Candidate value columns, tried in order.
pub const VALUE_FIELDS: &[&str] = &[
    "check_value",
    "value",
    "metric_value",
    "ratio",
    "count",
    "row_count",
];

/// Message of an `ERROR` result.
pub const INVALID_VALUE_MESSAGE: &str = "Invalid or missing numeric value in result row";

/// Column holding the check name in every output row.
pub const CHECK_NAME_FIELD: &str = "check_name";

/// Classifies output rows into [`CheckResult`]s.
///
/// Row-level problems never fail the batch: a row with no usable value becomes
/// an `ERROR` result and a row naming an unknown check is dropped.
///
/// # Examples
///
/// ```rust
/// use sentinel_guard::core::{Check, CheckStatus, DataSource, Suite, Threshold};
/// use sentinel_guard::engine::ResultClassifier;
/// use sentinel_guard::rules::builtin;
/// use serde_json::json;
///
/// let suite = Suite::builder("orders", DataSource::table("orders"))
///     .check(
///         Check::builder("a")
///             .rule(builtin::row_count())
///             .threshold(Threshold::at_least(100.0))
///             .build(),
///     )
///     .build()
///     .unwrap();
///
/// let rows = vec![json!({"check_name": "a", "value": 150}).as_object().cloned().unwrap()];
/// let results = ResultClassifier::new().classify(&suite, &rows);
/// assert_eq!(results[0].status(), CheckStatus::Pass);
/// assert_eq!(results[0].value(), Some(150.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResultClassifier {
    log_config: LogConfig,
}

impl ResultClassifier {
    /// Creates a classifier with default logging.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Classifies `rows` in order. Rows matching no check are skipped.
    pub fn classify(&self, suite: &Suite, rows: &[Row]) -> Vec<CheckResult> {
        let mut results = Vec::with_capacity(rows.len());

        for row in rows {
            let Some(name) = row.get(CHECK_NAME_FIELD).and_then(Value::as_str) else {
                warn!(suite.name = %suite.name(), "Dropping result row without a check name");
                continue;
            };
            let Some(check) = suite.check(name) else {
                warn!(
                    suite.name = %suite.name(),
                    check.name = %name,
                    "Dropping result row for unknown check"
                );
                continue;
            };

            let threshold = check.effective_threshold();
            let result = match extract_value(row) {
                Some(value) => {
                    let within = threshold.is_within(value);
                    let (status, relation) = if within {
                        (CheckStatus::Pass, "within")
                    } else {
                        (CheckStatus::Fail, "outside")
                    };
                    CheckResult::new(
                        name,
                        status,
                        check.severity(),
                        format!("{name}: value {value} {relation} {}", threshold.describe()),
                        Some(value),
                        &threshold,
                    )
                }
                None => CheckResult::new(
                    name,
                    CheckStatus::Error,
                    check.severity(),
                    INVALID_VALUE_MESSAGE,
                    None,
                    &threshold,
                ),
            };

            log_row!(
                self.log_config,
                check.name = %name,
                check.status = %result.status(),
                check.value = ?result.value(),
                "Classified result row"
            );
            results.push(result);
        }

        results
    }
}

/// Extracts the measured value of a row.
///
/// The first candidate field present with a non-null value decides: numbers
/// and numeric strings are accepted, anything else (including NaN and
/// infinities) yields `None`.
pub fn extract_value(row: &Row) -> Option<f64> {
    let raw = VALUE_FIELDS
        .iter()
        .filter_map(|field| row.get(*field))
        // A null field counts as absent; the next candidate is tried.
        .find(|value| !value.is_null())?;

    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    value.is_finite().then_some(value)
}
