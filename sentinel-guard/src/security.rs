//! Security utilities for the Sentinel data-quality library.
//!
//! Suite names, check names and rule names are spliced into SQL as bare
//! identifiers (`cte_<suite>_base`, `cte_<check>`), so they are held to a
//! strict identifier format. Table references and literal values get their own
//! validation and quoting helpers.

use crate::error::{Result, SentinelError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Maximum length of any name fragment.
pub const MAX_NAME_LENGTH: usize = 128;

/// SQL identifier validation and escaping utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates a name that becomes part of a SQL identifier.
    ///
    /// # Examples
    /// ```rust
    /// use sentinel_guard::security::SqlSecurity;
    ///
    /// assert!(SqlSecurity::validate_name_fragment("orders_daily").is_ok());
    /// assert!(SqlSecurity::validate_name_fragment("_private").is_ok());
    ///
    /// assert!(SqlSecurity::validate_name_fragment("orders daily").is_err());
    /// assert!(SqlSecurity::validate_name_fragment("1st_check").is_err());
    /// assert!(SqlSecurity::validate_name_fragment("x; DROP TABLE y").is_err());
    /// ```
    pub fn validate_name_fragment(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SentinelError::SecurityError(
                "Name cannot be empty or whitespace-only".to_string(),
            ));
        }

        if name.len() > MAX_NAME_LENGTH {
            return Err(SentinelError::SecurityError(format!(
                "Name too long (max {MAX_NAME_LENGTH} characters)"
            )));
        }

        static NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        if !NAME_REGEX.is_match(name) {
            return Err(SentinelError::SecurityError(format!(
                "Invalid name '{name}'. Names must start with a letter or underscore and contain only letters, numbers and underscores"
            )));
        }

        Ok(())
    }

    /// Validates a table reference before it is quoted into the base fragment.
    ///
    /// Dotted references (`project.dataset.table`) are allowed. `quote` is the
    /// quote character the reference will be wrapped in, if any; it may not
    /// appear inside the reference.
    pub fn validate_table_reference(table: &str, quote: Option<char>) -> Result<()> {
        if table.trim().is_empty() {
            return Err(SentinelError::SecurityError(
                "Table reference cannot be empty".to_string(),
            ));
        }

        if table.contains('\0') {
            return Err(SentinelError::SecurityError(
                "Table reference cannot contain null bytes".to_string(),
            ));
        }

        for pattern in [";", "--", "/*", "*/"] {
            if table.contains(pattern) {
                return Err(SentinelError::SecurityError(format!(
                    "Table reference contains dangerous pattern: '{pattern}'"
                )));
            }
        }

        if let Some(q) = quote {
            if table.contains(q) {
                return Err(SentinelError::SecurityError(format!(
                    "Table reference cannot contain the quote character {q}"
                )));
            }
        }

        Ok(())
    }

    /// Validates a regex pattern for safety.
    ///
    /// Returns the pattern with single quotes doubled, ready to be placed in a
    /// SQL string literal.
    pub fn validate_regex_pattern(pattern: &str) -> Result<String> {
        if pattern.len() > 1000 {
            return Err(SentinelError::SecurityError(
                "Regex pattern too long (max 1000 characters)".to_string(),
            ));
        }

        if pattern.contains('\0') {
            return Err(SentinelError::SecurityError(
                "Regex pattern cannot contain null bytes".to_string(),
            ));
        }

        if let Err(e) = Regex::new(pattern) {
            return Err(SentinelError::SecurityError(format!(
                "Invalid regex pattern: {e}"
            )));
        }

        Self::check_redos_patterns(pattern)?;

        Ok(pattern.replace('\'', "''"))
    }

    /// Renders a JSON value as a SQL literal.
    ///
    /// ```rust
    /// use sentinel_guard::security::SqlSecurity;
    /// use serde_json::json;
    ///
    /// assert_eq!(SqlSecurity::sql_literal(&json!("O'Brien")), "'O''Brien'");
    /// assert_eq!(SqlSecurity::sql_literal(&json!(42)), "42");
    /// assert_eq!(SqlSecurity::sql_literal(&json!(true)), "TRUE");
    /// assert_eq!(SqlSecurity::sql_literal(&json!(null)), "NULL");
    /// ```
    pub fn sql_literal(value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => quote_string(s),
            other => quote_string(&other.to_string()),
        }
    }

    /// Catches the obvious catastrophic-backtracking shapes only.
    fn check_redos_patterns(pattern: &str) -> Result<()> {
        let dangerous_patterns = &["(.*)*", "(.*)+", "(.+)+", "(a+)+", "(a*)*"];

        for dangerous in dangerous_patterns {
            if pattern.contains(dangerous) {
                return Err(SentinelError::SecurityError(
                    "Regex pattern might cause ReDoS attack".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
