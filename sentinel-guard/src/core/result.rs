//! Per-check results and per-run metadata.

use super::{flatten_object, CheckStatus, Params, RunStatus, Severity, Threshold};
use crate::error::{Result, SentinelError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The classified outcome of one check.
///
/// Results are built once by the classifier and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub(crate) check_name: String,
    pub(crate) status: CheckStatus,
    pub(crate) severity: Severity,
    pub(crate) message: String,
    pub(crate) value: Option<f64>,
    pub(crate) threshold_lower: Option<f64>,
    pub(crate) threshold_upper: Option<f64>,
}

impl CheckResult {
    /// Creates a result, copying the bounds out of `threshold`.
    pub fn new(
        check_name: impl Into<String>,
        status: CheckStatus,
        severity: Severity,
        message: impl Into<String>,
        value: Option<f64>,
        threshold: &Threshold,
    ) -> Self {
        Self {
            check_name: check_name.into(),
            status,
            severity,
            message: message.into(),
            value,
            threshold_lower: threshold.lower(),
            threshold_upper: threshold.upper(),
        }
    }

    /// Returns the check name.
    pub fn check_name(&self) -> &str {
        &self.check_name
    }

    /// Returns the status.
    pub fn status(&self) -> CheckStatus {
        self.status
    }

    /// Returns the severity copied from the check.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the measured value; `None` for `ERROR` results.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Returns the lower bound the value was checked against.
    pub fn threshold_lower(&self) -> Option<f64> {
        self.threshold_lower
    }

    /// Returns the upper bound the value was checked against.
    pub fn threshold_upper(&self) -> Option<f64> {
        self.threshold_upper
    }

    /// Returns true for `PASS`.
    pub fn is_pass(&self) -> bool {
        self.status == CheckStatus::Pass
    }

    /// Flat export shape with the seven mandatory columns.
    pub fn to_flat_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("check_name".into(), Value::from(self.check_name.as_str()));
        record.insert("status".into(), Value::from(self.status.as_str()));
        record.insert("severity".into(), Value::from(self.severity.as_str()));
        record.insert("value".into(), number_or_null(self.value));
        record.insert("threshold_lower".into(), number_or_null(self.threshold_lower));
        record.insert("threshold_upper".into(), number_or_null(self.threshold_upper));
        record.insert("message".into(), Value::from(self.message.as_str()));
        record
    }

    /// Rebuilds a result from its flat export shape. Extra columns are ignored.
    pub fn from_flat_record(record: &Map<String, Value>) -> Result<Self> {
        let check_name = record
            .get("check_name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SentinelError::Serialization("flat record has no check_name".to_string())
            })?
            .to_string();

        let status: CheckStatus = field(record, "status")?;
        let severity: Severity = field(record, "severity")?;

        Ok(Self {
            check_name,
            status,
            severity,
            message: record
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            value: optional_number(record, "value")?,
            threshold_lower: optional_number(record, "threshold_lower")?,
            threshold_upper: optional_number(record, "threshold_upper")?,
        })
    }
}

fn number_or_null(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

fn field<T: serde::de::DeserializeOwned>(record: &Map<String, Value>, key: &str) -> Result<T> {
    let value = record
        .get(key)
        .cloned()
        .ok_or_else(|| SentinelError::Serialization(format!("flat record has no {key}")))?;
    Ok(serde_json::from_value(value)?)
}

fn optional_number(record: &Map<String, Value>, key: &str) -> Result<Option<f64>> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(SentinelError::Serialization(format!(
            "flat record field {key} is not a number: {other}"
        ))),
    }
}

/// Bookkeeping for one orchestration run.
///
/// Created when a run starts and finalized exactly once by [`finish`], on
/// every exit path.
///
/// [`finish`]: RunMetadata::finish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub suite_name: String,
    pub job_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<f64>,
    pub bytes_processed: Option<u64>,
    pub cache_hit: Option<bool>,
    pub validate_first: bool,
    pub validate_only: bool,
    pub status: RunStatus,
    pub errors: Vec<String>,
    pub extra: Params,
}

impl RunMetadata {
    /// Starts the clock for a run of `suite_name`.
    pub fn start(suite_name: impl Into<String>, validate_first: bool, validate_only: bool) -> Self {
        Self {
            suite_name: suite_name.into(),
            job_id: None,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            bytes_processed: None,
            cache_hit: None,
            validate_first,
            validate_only,
            status: RunStatus::Unknown,
            errors: Vec::new(),
            extra: Params::new(),
        }
    }

    /// Appends an error message.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Sets the final status and stops the clock.
    ///
    /// Only the first call has any effect; returns whether this call
    /// finalized the metadata.
    pub fn finish(&mut self, status: RunStatus) -> bool {
        if self.ended_at.is_some() {
            return false;
        }
        let ended_at = Utc::now();
        let elapsed = ended_at.signed_duration_since(self.started_at);
        self.duration_ms = Some(
            elapsed
                .num_microseconds()
                .map_or(elapsed.num_milliseconds() as f64, |us| us as f64 / 1000.0),
        );
        self.ended_at = Some(ended_at);
        self.status = status;
        true
    }

    /// Returns true once [`finish`](Self::finish) has run.
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Number of recorded errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Flat key-value shape: nested `errors` and `extra` become dotted keys,
    /// plus a derived `error_count`.
    pub fn to_flat_record(&self) -> Map<String, Value> {
        let mut record = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => flatten_object(&map),
            _ => Map::new(),
        };
        record.insert("error_count".into(), Value::from(self.error_count()));
        record
    }
}
