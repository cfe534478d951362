//! Declarative suite definitions loaded from JSON.
//!
//! ```json
//! {
//!   "name": "orders",
//!   "owner": "data-platform",
//!   "data_source": {"type": "TABLE", "table": "shop.orders"},
//!   "checks": [
//!     {"name": "id_not_null", "rule": "not_null", "column_name": "id",
//!      "severity": "CRITICAL", "threshold": {"value": 0}},
//!     {"name": "status_values", "rule": "accepted_values", "column_name": "status",
//!      "rule_params": {"accepted_values": ["new", "paid"]}}
//!   ]
//! }
//! ```
//!
//! Checks name their rule; [`SuiteDefinition::into_suite`] resolves every rule
//! through a [`RuleRegistry`] and builds a validated [`Suite`].

use crate::core::{Check, DataSource, Params, Severity, Suite, Threshold};
use crate::error::{ErrorContext, Result, SentinelError};
use crate::rules::builtin::{self, FreshnessGranularity};
use crate::rules::{RuleRegistry, RuleTemplate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// A suite as written in a definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub data_source: DataSource,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub checks: Vec<CheckDefinition>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// A check as written in a definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rule name, resolved case-insensitively
    pub rule: String,
    /// Instance defaults for the rule
    #[serde(default)]
    pub rule_params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
}

impl SuiteDefinition {
    /// Parses a definition from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a definition file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read suite definition '{}'", path.display()))?;
        let definition = Self::from_json_str(&content)?;
        debug!(
            suite.name = %definition.name,
            suite.checks = definition.checks.len(),
            definition.path = %path.display(),
            "Loaded suite definition"
        );
        Ok(definition)
    }

    /// Resolves every rule and builds the suite.
    ///
    /// # Errors
    ///
    /// [`SentinelError::RuleNotFound`] for an unknown rule, a security error
    /// for an invalid `regex_pattern`, a configuration error for a malformed
    /// built-in argument, and any [`SuiteBuilder::build`] error.
    ///
    /// [`SuiteBuilder::build`]: crate::core::SuiteBuilder::build
    pub fn into_suite(self, registry: &RuleRegistry) -> Result<Suite> {
        let mut builder = Suite::builder(self.name, self.data_source)
            .params(self.params);
        if let Some(domain) = self.domain {
            builder = builder.domain(domain);
        }
        if let Some(owner) = self.owner {
            builder = builder.owner(owner);
        }
        for (key, value) in self.tags {
            builder = builder.tag(key, value);
        }

        for check in self.checks {
            builder = builder.check(check.into_check(registry)?);
        }
        builder.build()
    }
}

impl CheckDefinition {
    /// Resolves the rule and builds the check.
    pub fn into_check(mut self, registry: &RuleRegistry) -> Result<Check> {
        let rule = resolve_rule(registry, &self.rule, self.rule_params, &mut self.params)?;

        let mut builder = Check::builder(self.name)
            .rule(rule)
            .params(self.params)
            .severity(self.severity);
        if let Some(description) = self.description {
            builder = builder.description(description);
        }
        if let Some(column) = self.column_name {
            builder = builder.column(column);
        }
        if let Some(threshold) = self.threshold {
            builder = builder.threshold(threshold);
        }
        Ok(builder.build())
    }
}

/// Resolves `name`, routing built-ins with constructor arguments through their
/// accessors so patterns get validated, values become SQL literals and units
/// are checked.
///
/// The argument is taken out of both parameter maps so a raw value can never
/// override the prepared one at render time; the check's value wins when
/// both carry it.
fn resolve_rule(
    registry: &RuleRegistry,
    name: &str,
    mut rule_params: Params,
    check_params: &mut Params,
) -> Result<RuleTemplate> {
    let mut take = |key: &str| {
        let from_rule = rule_params.remove(key);
        check_params.remove(key).or(from_rule)
    };

    let template = match name.trim().to_lowercase().as_str() {
        "regex_match" => match take("regex_pattern") {
            Some(Value::String(pattern)) => builtin::regex_match(&pattern)?,
            Some(other) => {
                return Err(SentinelError::Configuration(format!(
                    "regex_pattern must be a string, got {other}"
                )))
            }
            None => registry.resolve(name)?,
        },
        "accepted_values" => match take("accepted_values") {
            Some(Value::Array(values)) => builtin::accepted_values(values),
            Some(other) => {
                return Err(SentinelError::Configuration(format!(
                    "accepted_values must be a list, got {other}"
                )))
            }
            None => registry.resolve(name)?,
        },
        "freshness" => builtin::freshness(granularity(take("granularity"))?),
        _ => registry.resolve(name)?,
    };
    Ok(template.with_params(rule_params))
}

/// Parses a freshness unit case-insensitively; absent means the default.
fn granularity(value: Option<Value>) -> Result<FreshnessGranularity> {
    match value {
        None | Some(Value::Null) => Ok(FreshnessGranularity::default()),
        Some(Value::String(unit)) => {
            serde_json::from_value(Value::String(unit.trim().to_uppercase())).map_err(|_| {
                SentinelError::Configuration(format!("unknown freshness granularity '{unit}'"))
            })
        }
        Some(other) => Err(SentinelError::Configuration(format!(
            "granularity must be a string, got {other}"
        ))),
    }
}
