//! Tera-backed SQL template rendering.

use crate::core::Params;
use crate::error::{Result, SentinelError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tera::{Context, Tera};

/// First identifier of every `{{ ... }}` expression.
static EXPRESSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{\{-?\s*([A-Za-z_][A-Za-z0-9_]*)")
        .expect("Hard-coded regex pattern should be valid")
});

/// Variable read by a `for` iterable or an `if`/`elif` condition.
static STATEMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(
        r"\{%-?\s*(?:for\s+[A-Za-z_][A-Za-z0-9_]*(?:\s*,\s*[A-Za-z_][A-Za-z0-9_]*)?\s+in|if|elif)\s+(?:not\s+)?([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("Hard-coded regex pattern should be valid")
});

/// Tera's message for a variable missing from the context.
static NOT_FOUND_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"Variable `([A-Za-z_][A-Za-z0-9_]*)[^`]*` not found")
        .expect("Hard-coded regex pattern should be valid")
});

/// Names bound inside the template by `for` loops and `set` statements.
static LOCALS_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(
        r"\{%-?\s*(?:for\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s*,\s*([A-Za-z_][A-Za-z0-9_]*))?\s+in\b|set(?:_global)?\s+([A-Za-z_][A-Za-z0-9_]*))",
    )
    .expect("Hard-coded regex pattern should be valid")
});

/// Placeholder markers left in rendered output.
static RESIDUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{\{-?\s*(.*?)\s*-?\}\}").expect("Hard-coded regex pattern should be valid")
});

const BUILTIN_NAMES: &[&str] = &[
    "true",
    "false",
    "True",
    "False",
    "none",
    "None",
    "loop",
    "__tera_context",
];

/// Renders rule templates and data-source fragments.
///
/// Rendering fails with [`SentinelError::MissingParameter`] rather than ever
/// letting a placeholder through: variables referenced by the template but
/// absent from the parameters are reported before rendering, and any marker
/// still present in the output is reported after it.
///
/// # Examples
///
/// ```rust
/// use sentinel_guard::rules::SqlTemplateEngine;
/// use serde_json::json;
///
/// let engine = SqlTemplateEngine::new();
/// let params = json!({"column_name": "status", "values": ["'a'", "'b'"]});
/// let sql = engine
///     .render(
///         "accepted",
///         "{{ column_name }} IN ({{ values | join(sep=\", \") }})",
///         params.as_object().unwrap(),
///     )
///     .unwrap();
/// assert_eq!(sql, "status IN ('a', 'b')");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SqlTemplateEngine;

impl SqlTemplateEngine {
    /// Creates a new engine.
    pub fn new() -> Self {
        Self
    }

    /// Returns the top-level variables a template reads, excluding names the
    /// template binds itself.
    pub fn referenced_variables(&self, template: &str) -> BTreeSet<String> {
        let locals: BTreeSet<&str> = LOCALS_REGEX
            .captures_iter(template)
            .flat_map(|caps| {
                [caps.get(1), caps.get(2), caps.get(3)]
                    .into_iter()
                    .flatten()
                    .map(|m| m.as_str())
            })
            .collect();

        EXPRESSION_REGEX
            .captures_iter(template)
            .chain(STATEMENT_REGEX.captures_iter(template))
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .filter(|name| !locals.contains(name) && !BUILTIN_NAMES.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Checks that a template parses.
    pub fn check_syntax(&self, rule: &str, template: &str) -> Result<()> {
        let mut tera = Tera::default();
        tera.add_raw_template(rule, template)
            .map_err(|e| SentinelError::Template {
                rule: rule.to_string(),
                message: error_chain(&e),
            })?;
        Ok(())
    }

    /// Renders `template` with `params`.
    ///
    /// `rule` names the template in error messages. A referenced variable
    /// bound to null counts as missing.
    pub fn render(&self, rule: &str, template: &str, params: &Params) -> Result<String> {
        let unresolved: Vec<String> = self
            .referenced_variables(template)
            .into_iter()
            .filter(|name| params.get(name).map_or(true, serde_json::Value::is_null))
            .collect();
        if !unresolved.is_empty() {
            return Err(SentinelError::missing_parameter(rule, unresolved));
        }

        let mut context = Context::new();
        for (key, value) in params {
            context.insert(key.as_str(), value);
        }

        let rendered = Tera::one_off(template, &context, false).map_err(|e| {
            let message = error_chain(&e);
            match NOT_FOUND_REGEX.captures(&message).and_then(|caps| caps.get(1)) {
                Some(name) => SentinelError::missing_parameter(rule, vec![name.as_str().to_string()]),
                None => SentinelError::Template {
                    rule: rule.to_string(),
                    message,
                },
            }
        })?;

        if rendered.contains("{{") || rendered.contains("}}") {
            let mut residue: Vec<String> = RESIDUE_REGEX
                .captures_iter(&rendered)
                .filter_map(|caps| caps.get(1))
                .map(|m| format!("unresolved '{}'", m.as_str()))
                .collect();
            if residue.is_empty() {
                residue.push("unresolved template markers".to_string());
            }
            return Err(SentinelError::missing_parameter(rule, residue));
        }

        Ok(rendered)
    }
}

/// Joins an error with its sources, since tera keeps the useful detail in the
/// source chain.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
