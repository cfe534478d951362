//! Outcome enums for checks and runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    /// The measured value is within the threshold
    Pass,
    /// The measured value is outside the threshold
    Fail,
    /// No usable value could be extracted from the output row
    Error,
}

impl CheckStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Error => "ERROR",
        }
    }

    /// Returns true for both `Fail` and `Error`.
    pub fn is_fail(&self) -> bool {
        matches!(self, CheckStatus::Fail | CheckStatus::Error)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall status of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    #[default]
    Unknown,
    Success,
    Failed,
    ValidationSuccess,
    ValidationFailed,
}

impl RunStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Unknown => "UNKNOWN",
            RunStatus::Success => "SUCCESS",
            RunStatus::Failed => "FAILED",
            RunStatus::ValidationSuccess => "VALIDATION_SUCCESS",
            RunStatus::ValidationFailed => "VALIDATION_FAILED",
        }
    }

    /// Returns true when the run ended on an engine failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, RunStatus::Failed | RunStatus::ValidationFailed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
