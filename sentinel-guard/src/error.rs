//! Error types for the Sentinel data-quality library.
//!
//! All errors in the library are represented by the [`SentinelError`] enum.
//! Structural errors (a broken suite or rule definition) are returned to the
//! caller immediately. Engine errors raised by a [`QueryExecutor`] are absorbed
//! by the runner into [`RunMetadata`] instead of escaping `run_suite`.
//!
//! [`QueryExecutor`]: crate::engine::QueryExecutor
//! [`RunMetadata`]: crate::core::RunMetadata

use thiserror::Error;

/// The main error type for the Sentinel library.
#[derive(Error, Debug)]
pub enum SentinelError {
    /// A rule template was rendered without satisfying its parameter contract,
    /// or left placeholders unresolved.
    #[error("Rule '{rule}' missing required parameter(s): {}", .params.join(", "))]
    MissingParameter {
        /// Name of the rule being rendered
        rule: String,
        /// Every offending parameter name
        params: Vec<String>,
    },

    /// A check reached compilation without a bound rule template.
    #[error("Check '{check}' has no associated rule template")]
    MissingRuleTemplate { check: String },

    /// A registry lookup failed.
    #[error("Rule '{name}' not found in built-in or plugin registry")]
    RuleNotFound { name: String },

    /// A suite definition violates a structural invariant.
    #[error("Invalid suite '{suite}': {message}")]
    InvalidSuiteDefinition { suite: String, message: String },

    /// A rule definition is malformed.
    #[error("Invalid rule '{rule}': {message}")]
    InvalidRuleDefinition { rule: String, message: String },

    /// The template engine rejected a template for a reason other than a
    /// missing parameter.
    #[error("Template error in rule '{rule}': {message}")]
    Template { rule: String, message: String },

    /// The execution engine rejected the statement during a dry run.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        /// Job identifier assigned by the engine, if any
        job_id: Option<String>,
        /// Messages reported by the engine
        engine_errors: Vec<String>,
    },

    /// The execution engine failed to run the statement.
    #[error("Execution failed: {message}")]
    ExecutionFailed {
        message: String,
        /// Job identifier assigned by the engine, if any
        job_id: Option<String>,
        /// Messages reported by the engine
        engine_errors: Vec<String>,
    },

    /// An export sink could not write its payload.
    #[error("Export via '{exporter}' failed: {message}")]
    Export { exporter: String, message: String },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),
}

/// A type alias for `Result<T, SentinelError>`.
pub type Result<T> = std::result::Result<T, SentinelError>;

impl SentinelError {
    /// Creates a missing-parameter error for the given rule.
    pub fn missing_parameter<I, S>(rule: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingParameter {
            rule: rule.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an invalid suite definition error.
    pub fn invalid_suite(suite: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSuiteDefinition {
            suite: suite.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid rule definition error.
    pub fn invalid_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRuleDefinition {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Returns the job identifier carried by an engine failure.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::ValidationFailed { job_id, .. } | Self::ExecutionFailed { job_id, .. } => {
                job_id.as_deref()
            }
            _ => None,
        }
    }

    /// Flattens the error into the ordered list of messages recorded on a run:
    /// the error itself first, then every engine-reported message.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        if let Self::ValidationFailed { engine_errors, .. }
        | Self::ExecutionFailed { engine_errors, .. } = self
        {
            messages.extend(engine_errors.iter().cloned());
        }
        messages
    }
}

impl From<serde_json::Error> for SentinelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<SentinelError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            SentinelError::Internal(inner) => SentinelError::Internal(format!("{msg}: {inner}")),
            other => SentinelError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                SentinelError::Internal(inner) => {
                    SentinelError::Internal(format!("{msg}: {inner}"))
                }
                other => SentinelError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_lists_every_name() {
        let err = SentinelError::missing_parameter("value_range", ["lower_bound", "upper_bound"]);
        assert_eq!(
            err.to_string(),
            "Rule 'value_range' missing required parameter(s): lower_bound, upper_bound"
        );
    }

    #[test]
    fn test_rule_not_found() {
        let err = SentinelError::RuleNotFound {
            name: "does_not_exist".to_string(),
        };
        assert!(err.to_string().contains("does_not_exist"));
    }

    #[test]
    fn test_engine_messages_are_listed_separately() {
        let err = SentinelError::ExecutionFailed {
            message: "query aborted".to_string(),
            job_id: Some("job-1".to_string()),
            engine_errors: vec!["Syntax error at [3:1]".to_string(), "quota".to_string()],
        };

        assert_eq!(err.job_id(), Some("job-1"));
        assert_eq!(
            err.messages(),
            vec![
                "Execution failed: query aborted".to_string(),
                "Syntax error at [3:1]".to_string(),
                "quota".to_string(),
            ]
        );
    }

    #[test]
    fn test_messages_for_structural_error() {
        let err = SentinelError::MissingRuleTemplate {
            check: "orphan".to_string(),
        };
        assert_eq!(err.messages().len(), 1);
        assert!(err.job_id().is_none());
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(SentinelError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation()
            .context("During suite compilation")
            .unwrap_err();
        assert!(err.to_string().contains("During suite compilation"));
    }
}
