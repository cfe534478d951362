//! Check severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity of a check.
///
/// Severity says how critical a failing check is and which action a consumer
/// of the results should take. Levels are ordered: Critical > Error > Warn > Info.
///
/// # Usage Guidelines
///
/// - **Critical**: needs immediate attention or manual intervention
/// - **Error**: significant issue, may block downstream jobs
/// - **Warn**: should alert but does not block anything
/// - **Info**: informational, for reporting only
///
/// # Examples
///
/// ```rust
/// use sentinel_guard::core::Severity;
///
/// assert!(Severity::Critical > Severity::Error);
/// assert!(Severity::Warn.is_at_least(Severity::Info));
/// assert_eq!(Severity::default(), Severity::Error);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational only
    Info = 0,
    /// Minor issue
    Warn = 1,
    /// Significant issue
    #[default]
    Error = 2,
    /// Severe issue
    Critical = 3,
}

impl Severity {
    /// Returns the string representation of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Checks if this severity is at least as high as another one.
    pub fn is_at_least(&self, other: Severity) -> bool {
        *self >= other
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
    }

    #[test]
    fn test_severity_is_at_least() {
        assert!(Severity::Critical.is_at_least(Severity::Info));
        assert!(Severity::Error.is_at_least(Severity::Error));
        assert!(!Severity::Warn.is_at_least(Severity::Error));
        assert!(!Severity::Info.is_at_least(Severity::Warn));
    }

    #[test]
    fn test_severity_serde() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");

        let severity: Severity = serde_json::from_str("\"WARN\"").unwrap();
        assert_eq!(severity, Severity::Warn);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Info.to_string(), "INFO");
        assert_eq!(Severity::Error.to_string(), "ERROR");
    }
}
