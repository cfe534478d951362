//! A single validation rule instance within a suite.

use super::{Params, Severity, Threshold};
use crate::rules::RuleTemplate;
use serde_json::Value;

/// One check: a rule bound to concrete parameters, a severity and an optional
/// threshold.
///
/// The check name doubles as the SQL sub-query identifier (`cte_<name>`) and as
/// the key used to match output rows back to the check, so it must be unique
/// within its suite.
///
/// # Examples
///
/// ```rust
/// use sentinel_guard::core::{Check, Severity, Threshold};
/// use sentinel_guard::rules::builtin;
///
/// let check = Check::builder("id_not_null")
///     .description("Primary key is always present")
///     .rule(builtin::not_null())
///     .column("id")
///     .severity(Severity::Critical)
///     .threshold(Threshold::exact(0.0))
///     .build();
///
/// assert_eq!(check.name(), "id_not_null");
/// assert_eq!(check.column_name(), Some("id"));
/// ```
#[derive(Debug, Clone)]
pub struct Check {
    name: String,
    description: Option<String>,
    rule: Option<RuleTemplate>,
    column_name: Option<String>,
    params: Params,
    severity: Severity,
    threshold: Option<Threshold>,
}

impl Check {
    /// Starts building a check.
    pub fn builder(name: impl Into<String>) -> CheckBuilder {
        CheckBuilder::new(name)
    }

    /// Returns the check name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the bound rule, if any.
    pub fn rule(&self) -> Option<&RuleTemplate> {
        self.rule.as_ref()
    }

    /// Returns the column the rule inspects, if any.
    pub fn column_name(&self) -> Option<&str> {
        self.column_name.as_deref()
    }

    /// Returns the check-level parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the declared threshold, if any.
    pub fn threshold(&self) -> Option<&Threshold> {
        self.threshold.as_ref()
    }

    /// The threshold used for classification; unbounded when none is declared.
    pub fn effective_threshold(&self) -> Threshold {
        self.threshold.unwrap_or_default()
    }
}

/// Builder for [`Check`].
#[derive(Debug, Clone)]
pub struct CheckBuilder {
    check: Check,
}

impl CheckBuilder {
    /// Creates a builder with `Severity::Error` and no rule.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            check: Check {
                name: name.into(),
                description: None,
                rule: None,
                column_name: None,
                params: Params::new(),
                severity: Severity::default(),
                threshold: None,
            },
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.check.description = Some(description.into());
        self
    }

    /// Binds the rule.
    pub fn rule(mut self, rule: RuleTemplate) -> Self {
        self.check.rule = Some(rule);
        self
    }

    /// Sets the column the rule inspects.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.check.column_name = Some(column.into());
        self
    }

    /// Adds one check-level parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.check.params.insert(key.into(), value.into());
        self
    }

    /// Adds check-level parameters, replacing existing keys.
    pub fn params(mut self, params: Params) -> Self {
        self.check.params.extend(params);
        self
    }

    /// Sets the severity.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.check.severity = severity;
        self
    }

    /// Sets the threshold.
    pub fn threshold(mut self, threshold: Threshold) -> Self {
        self.check.threshold = Some(threshold);
        self
    }

    /// Builds the check. Structural validation happens when the check is added
    /// to a suite.
    pub fn build(self) -> Check {
        self.check
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::builtin;

    #[test]
    fn test_defaults() {
        let check = Check::builder("rows").build();
        assert_eq!(check.severity(), Severity::Error);
        assert!(check.rule().is_none());
        assert!(check.threshold().is_none());
        assert!(check.effective_threshold().is_unbounded());
        assert!(check.params().is_empty());
    }

    #[test]
    fn test_builder_sets_everything() {
        let check = Check::builder("amount_range")
            .description("Amounts stay positive")
            .rule(builtin::value_range(0.0, 1000.0))
            .column("amount")
            .param("partition", "2024-01-01")
            .severity(Severity::Warn)
            .threshold(Threshold::at_most(5.0))
            .build();

        assert_eq!(check.description(), Some("Amounts stay positive"));
        assert_eq!(check.rule().map(|r| r.name()), Some("value_range"));
        assert_eq!(check.params()["partition"], "2024-01-01");
        assert_eq!(check.severity(), Severity::Warn);
        assert_eq!(check.effective_threshold(), Threshold::at_most(5.0));
    }
}
