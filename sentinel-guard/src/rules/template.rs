//! Rule definitions and their per-check invocations.

use super::SqlTemplateEngine;
use crate::core::Params;
use crate::error::{Result, SentinelError};
use crate::security::SqlSecurity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Immutable description of a rule: what it is called, what SQL it produces
/// and which parameters it cannot render without.
///
/// Definitions are shared behind an [`Arc`]; the per-check parameters live on
/// [`RuleTemplate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique lookup key, compared case-insensitively
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Template body producing one summary row
    pub template: String,
    /// Parameters that must be present and non-empty at render time
    #[serde(default)]
    pub required_params: Vec<String>,
}

impl RuleDefinition {
    /// Creates a definition with no required parameters.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            template: template.into(),
            required_params: Vec::new(),
        }
    }

    /// Sets the required parameters.
    pub fn with_required_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Registry key for this definition.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Checks the name and that the template parses.
    pub fn validate(&self, engine: &SqlTemplateEngine) -> Result<()> {
        SqlSecurity::validate_name_fragment(&self.name)
            .map_err(|e| SentinelError::invalid_rule(&self.name, e.to_string()))?;
        if self.template.trim().is_empty() {
            return Err(SentinelError::invalid_rule(&self.name, "template is empty"));
        }
        engine.check_syntax(&self.name, &self.template)
    }
}

/// A rule bound to instance-level default parameters.
///
/// # Examples
///
/// ```rust
/// use sentinel_guard::rules::builtin;
/// use sentinel_guard::rules::SqlTemplateEngine;
/// use serde_json::json;
///
/// let rule = builtin::not_null();
/// let extra = json!({"check_name": "id_not_null", "suite_name": "users", "column_name": "id"});
/// let sql = rule
///     .render(&SqlTemplateEngine::new(), extra.as_object().unwrap())
///     .unwrap();
/// assert!(sql.contains("id IS NULL"));
/// ```
#[derive(Debug, Clone)]
pub struct RuleTemplate {
    definition: Arc<RuleDefinition>,
    params: Params,
}

impl RuleTemplate {
    /// Creates an invocation with no default parameters.
    pub fn new(definition: Arc<RuleDefinition>) -> Self {
        Self {
            definition,
            params: Params::new(),
        }
    }

    /// Adds default parameters, replacing existing keys.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    /// Adds one default parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns the rule name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Returns the rule description.
    pub fn description(&self) -> &str {
        &self.definition.description
    }

    /// Returns the template body.
    pub fn template(&self) -> &str {
        &self.definition.template
    }

    /// Returns the required parameters.
    pub fn required_params(&self) -> &[String] {
        &self.definition.required_params
    }

    /// Returns the instance default parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the shared definition.
    pub fn definition(&self) -> &Arc<RuleDefinition> {
        &self.definition
    }

    /// Instance defaults overlaid with `extra`; `extra` wins on conflicts.
    pub fn merged_params(&self, extra: &Params) -> Params {
        let mut merged = self.params.clone();
        for (key, value) in extra {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Required parameters that are absent, null or empty in `params`.
    pub fn missing_params(&self, params: &Params) -> Vec<String> {
        self.definition
            .required_params
            .iter()
            .filter(|name| !is_present(params.get(name.as_str())))
            .cloned()
            .collect()
    }

    /// Renders the rule's SQL fragment.
    pub fn render(&self, engine: &SqlTemplateEngine, extra: &Params) -> Result<String> {
        let merged = self.merged_params(extra);

        let missing = self.missing_params(&merged);
        if !missing.is_empty() {
            return Err(SentinelError::missing_parameter(self.name(), missing));
        }

        engine.render(self.name(), &self.definition.template, &merged)
    }
}

impl fmt::Display for RuleTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<RuleTemplate name='{}' required=[{}]>",
            self.name(),
            self.required_params().join(", ")
        )
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn range_rule() -> RuleTemplate {
        RuleTemplate::new(Arc::new(
            RuleDefinition::new(
                "value_range",
                "Counts out of range values",
                "SELECT '{{ check_name }}' AS check_name, {{ column_name }} < {{ lower_bound }} OR {{ column_name }} > {{ upper_bound }} AS value",
            )
            .with_required_params(["column_name", "lower_bound", "upper_bound"]),
        ))
    }

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_every_missing_parameter_is_reported() {
        let err = range_rule()
            .render(&SqlTemplateEngine::new(), &params(json!({"check_name": "r"})))
            .unwrap_err();

        match err {
            SentinelError::MissingParameter { rule, params } => {
                assert_eq!(rule, "value_range");
                assert_eq!(params, vec!["column_name", "lower_bound", "upper_bound"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_and_empty_values_count_as_missing() {
        let rule = range_rule();
        let missing = rule.missing_params(&params(json!({
            "column_name": "",
            "lower_bound": null,
            "upper_bound": 0,
        })));
        assert_eq!(missing, vec!["column_name", "lower_bound"]);

        let missing = rule.missing_params(&params(json!({
            "column_name": "x",
            "lower_bound": [],
            "upper_bound": false,
        })));
        assert_eq!(missing, vec!["lower_bound"]);
    }

    #[test]
    fn test_call_site_params_override_defaults() {
        let rule = range_rule()
            .with_param("lower_bound", 1)
            .with_param("upper_bound", 10);

        let sql = rule
            .render(
                &SqlTemplateEngine::new(),
                &params(json!({"check_name": "r", "column_name": "qty", "upper_bound": 99})),
            )
            .unwrap();
        assert!(sql.contains("qty < 1"));
        assert!(sql.contains("qty > 99"));
    }

    #[test]
    fn test_definition_validation() {
        let engine = SqlTemplateEngine::new();
        assert!(RuleDefinition::new("ok_rule", "", "SELECT 1")
            .validate(&engine)
            .is_ok());
        assert!(matches!(
            RuleDefinition::new("bad name", "", "SELECT 1").validate(&engine),
            Err(SentinelError::InvalidRuleDefinition { .. })
        ));
        assert!(matches!(
            RuleDefinition::new("blank", "", "  ").validate(&engine),
            Err(SentinelError::InvalidRuleDefinition { .. })
        ));
        assert!(matches!(
            RuleDefinition::new("broken", "", "{% if %}").validate(&engine),
            Err(SentinelError::Template { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            range_rule().to_string(),
            "<RuleTemplate name='value_range' required=[column_name, lower_bound, upper_bound]>"
        );
    }
}
