//! Suites and their data sources.

use super::{Check, Params};
use crate::error::{Result, SentinelError};
use crate::security::SqlSecurity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Kind of data source backing a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataSourceType {
    /// A named table
    #[default]
    Table,
    /// A raw query used as the base fragment
    Query,
}

impl fmt::Display for DataSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceType::Table => write!(f, "TABLE"),
            DataSourceType::Query => write!(f, "QUERY"),
        }
    }
}

/// The dataset a suite's checks run against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    /// Source kind
    #[serde(rename = "type", default)]
    pub source_type: DataSourceType,
    /// Table identifier, for `TABLE` sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Raw query text, for `QUERY` sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DataSource {
    /// A table source.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            source_type: DataSourceType::Table,
            table: Some(table.into()),
            query: None,
            description: None,
        }
    }

    /// A raw query source.
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            source_type: DataSourceType::Query,
            table: None,
            query: Some(query.into()),
            description: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks that exactly the field matching the source type is set.
    fn validate(&self) -> std::result::Result<(), String> {
        let has_table = self.table.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_query = self.query.as_deref().is_some_and(|q| !q.trim().is_empty());
        match self.source_type {
            DataSourceType::Table if !has_table => {
                Err("TABLE data source requires a table".to_string())
            }
            DataSourceType::Table if self.query.is_some() => {
                Err("TABLE data source must not also set a query".to_string())
            }
            DataSourceType::Query if !has_query => {
                Err("QUERY data source requires a query".to_string())
            }
            DataSourceType::Query if self.table.is_some() => {
                Err("QUERY data source must not also set a table".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// A named collection of checks sharing one data source.
///
/// Suites are only constructed through [`SuiteBuilder::build`], which enforces
/// name uniqueness and data-source consistency.
///
/// # Examples
///
/// ```rust
/// use sentinel_guard::core::{Check, DataSource, Suite, Threshold};
/// use sentinel_guard::rules::builtin;
///
/// let suite = Suite::builder("orders", DataSource::table("shop.orders"))
///     .owner("data-platform")
///     .check(
///         Check::builder("has_rows")
///             .rule(builtin::row_count())
///             .threshold(Threshold::at_least(1.0))
///             .build(),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(suite.checks().len(), 1);
/// assert!(suite.check("has_rows").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Suite {
    name: String,
    domain: Option<String>,
    owner: Option<String>,
    data_source: DataSource,
    params: Params,
    checks: Vec<Check>,
    tags: BTreeMap<String, String>,
}

impl Suite {
    /// Starts building a suite.
    pub fn builder(name: impl Into<String>, data_source: DataSource) -> SuiteBuilder {
        SuiteBuilder::new(name, data_source)
    }

    /// Returns the suite name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the domain, if any.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Returns the owner, if any.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Returns the data source.
    pub fn data_source(&self) -> &DataSource {
        &self.data_source
    }

    /// Returns the suite-level parameters applied to the base fragment.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the checks in declared order.
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Returns the tags.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Finds a check by exact name.
    pub fn check(&self, name: &str) -> Option<&Check> {
        self.checks.iter().find(|check| check.name() == name)
    }
}

/// Builder for [`Suite`].
#[derive(Debug, Clone)]
pub struct SuiteBuilder {
    name: String,
    domain: Option<String>,
    owner: Option<String>,
    data_source: DataSource,
    params: Params,
    checks: Vec<Check>,
    tags: BTreeMap<String, String>,
}

impl SuiteBuilder {
    /// Creates a builder.
    pub fn new(name: impl Into<String>, data_source: DataSource) -> Self {
        Self {
            name: name.into(),
            domain: None,
            owner: None,
            data_source,
            params: Params::new(),
            checks: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Sets the domain.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the owner.
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Adds one suite-level parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Adds suite-level parameters, replacing existing keys.
    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    /// Appends a check.
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Appends several checks.
    pub fn checks<I>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = Check>,
    {
        self.checks.extend(checks);
        self
    }

    /// Adds a tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Validates and builds the suite.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::InvalidSuiteDefinition`] when a name is not a
    /// valid identifier fragment, two checks share a name ignoring case, or
    /// the data source fields do not match its type.
    pub fn build(self) -> Result<Suite> {
        let invalid = |message: String| SentinelError::invalid_suite(&self.name, message);

        SqlSecurity::validate_name_fragment(&self.name)
            .map_err(|e| invalid(format!("suite name: {e}")))?;

        self.data_source.validate().map_err(invalid)?;

        // CTE names are compared case-insensitively by most engines.
        let base_name = format!("{}_base", self.name).to_lowercase();
        let mut seen = HashSet::new();
        for check in &self.checks {
            SqlSecurity::validate_name_fragment(check.name())
                .map_err(|e| invalid(format!("check name: {e}")))?;
            let folded = check.name().to_lowercase();
            if folded == base_name {
                return Err(invalid(format!(
                    "check name '{}' collides with the base fragment",
                    check.name()
                )));
            }
            if !seen.insert(folded) {
                return Err(invalid(format!(
                    "duplicate check name '{}'",
                    check.name()
                )));
            }
        }

        Ok(Suite {
            name: self.name,
            domain: self.domain,
            owner: self.owner,
            data_source: self.data_source,
            params: self.params,
            checks: self.checks,
            tags: self.tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::builtin;

    fn rows_check(name: &str) -> Check {
        Check::builder(name).rule(builtin::row_count()).build()
    }

    #[test]
    fn test_build_keeps_check_order() {
        let suite = Suite::builder("orders", DataSource::table("orders"))
            .checks([rows_check("b"), rows_check("a"), rows_check("c")])
            .tag("team", "growth")
            .build()
            .unwrap();
        let names: Vec<&str> = suite.checks().iter().map(Check::name).collect();
        assert_eq!(names, ["b", "a", "c"]);
        assert_eq!(suite.tags()["team"], "growth");
    }

    #[test]
    fn test_duplicate_check_names_are_rejected() {
        let err = Suite::builder("orders", DataSource::table("orders"))
            .check(rows_check("rows"))
            .check(rows_check("rows"))
            .build()
            .unwrap_err();
        match err {
            SentinelError::InvalidSuiteDefinition { suite, message } => {
                assert_eq!(suite, "orders");
                assert!(message.contains("duplicate check name 'rows'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_names_collide_ignoring_case() {
        let err = Suite::builder("orders", DataSource::table("orders"))
            .check(rows_check("rows"))
            .check(rows_check("ROWS"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate check name 'ROWS'"));

        let err = Suite::builder("orders", DataSource::table("orders"))
            .check(rows_check("ORDERS_BASE"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("collides with the base fragment"));
    }

    #[test]
    fn test_names_must_be_identifier_fragments() {
        assert!(Suite::builder("orders-daily", DataSource::table("orders"))
            .build()
            .is_err());
        assert!(Suite::builder("orders", DataSource::table("orders"))
            .check(rows_check("row count"))
            .build()
            .is_err());
        assert!(Suite::builder("orders", DataSource::table("orders"))
            .check(rows_check("orders_base"))
            .build()
            .is_err());
    }

    #[test]
    fn test_data_source_consistency() {
        let mut both = DataSource::table("orders");
        both.query = Some("SELECT 1".to_string());
        assert!(Suite::builder("s", both).build().is_err());

        let mut empty_query = DataSource::query("   ");
        empty_query.description = Some("nothing".to_string());
        assert!(Suite::builder("s", empty_query).build().is_err());

        let mut query_with_table = DataSource::query("SELECT 1 AS x");
        query_with_table.table = Some("orders".to_string());
        assert!(Suite::builder("s", query_with_table).build().is_err());

        assert!(Suite::builder("s", DataSource::query("SELECT 1 AS x"))
            .build()
            .is_ok());
    }

    #[test]
    fn test_data_source_deserializes_type_field() {
        let source: DataSource =
            serde_json::from_str(r#"{"type": "QUERY", "query": "SELECT 1"}"#).unwrap();
        assert_eq!(source.source_type, DataSourceType::Query);

        let source: DataSource = serde_json::from_str(r#"{"table": "orders"}"#).unwrap();
        assert_eq!(source.source_type, DataSourceType::Table);
    }
}
