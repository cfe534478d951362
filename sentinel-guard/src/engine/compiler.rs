//! Compiles a suite into one SQL statement.

use crate::core::{Check, DataSourceType, Params, Suite};
use crate::error::{Result, SentinelError};
use crate::rules::SqlTemplateEngine;
use crate::security::SqlSecurity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// How a `TABLE` data source identifier is quoted in the base fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableQuote {
    /// `` `project.dataset.table` ``
    #[default]
    Backtick,
    /// `"schema"."table"` style engines
    DoubleQuote,
    /// Inserted verbatim
    None,
}

impl TableQuote {
    /// The quote character, if any.
    pub fn quote_char(&self) -> Option<char> {
        match self {
            TableQuote::Backtick => Some('`'),
            TableQuote::DoubleQuote => Some('"'),
            TableQuote::None => None,
        }
    }

    fn apply(&self, table: &str) -> String {
        match self.quote_char() {
            Some(q) => format!("{q}{table}{q}"),
            None => table.to_string(),
        }
    }
}

/// Options for [`SuiteCompiler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Quoting applied to table identifiers
    #[serde(default)]
    pub table_quote: TableQuote,
}

impl CompilerOptions {
    /// Sets the table quoting style.
    pub fn with_table_quote(mut self, table_quote: TableQuote) -> Self {
        self.table_quote = table_quote;
        self
    }
}

/// Turns a [`Suite`] into a single statement: a base sub-query for the data
/// source, one named sub-query per check, and a `UNION ALL` over the checks in
/// declared order.
///
/// ```text
/// WITH cte_<suite>_base AS (...),
/// cte_<check_1> AS (...),
/// cte_<check_2> AS (...)
/// SELECT * FROM cte_<check_1>
/// UNION ALL
/// SELECT * FROM cte_<check_2>
/// ```
///
/// Compilation is deterministic: the same suite always yields the same text.
///
/// # Examples
///
/// ```rust
/// use sentinel_guard::core::{Check, DataSource, Suite};
/// use sentinel_guard::engine::SuiteCompiler;
/// use sentinel_guard::rules::builtin;
///
/// let suite = Suite::builder("orders", DataSource::table("shop.orders"))
///     .check(Check::builder("rows").rule(builtin::row_count()).build())
///     .build()
///     .unwrap();
///
/// let sql = SuiteCompiler::new().compile(&suite).unwrap();
/// assert!(sql.contains("WITH cte_orders_base AS (\nSELECT * FROM `shop.orders`\n)"));
/// assert!(sql.ends_with("SELECT * FROM cte_rows\n"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SuiteCompiler {
    engine: SqlTemplateEngine,
    options: CompilerOptions,
}

impl SuiteCompiler {
    /// Creates a compiler with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compiler with the given engine and options.
    pub fn with_engine(engine: SqlTemplateEngine, options: CompilerOptions) -> Self {
        Self { engine, options }
    }

    /// Creates a compiler with the given options.
    pub fn with_options(options: CompilerOptions) -> Self {
        Self {
            engine: SqlTemplateEngine::new(),
            options,
        }
    }

    /// Returns the options.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compiles `suite`.
    ///
    /// # Errors
    ///
    /// Fails with [`SentinelError::InvalidSuiteDefinition`] for a suite with no
    /// checks or an unsafe table reference, [`SentinelError::MissingRuleTemplate`]
    /// for a check without a rule, and [`SentinelError::MissingParameter`] when a
    /// fragment cannot be fully rendered.
    #[instrument(skip(self, suite), fields(
        suite.name = %suite.name(),
        suite.checks = suite.checks().len(),
        suite.source = %suite.data_source().source_type
    ))]
    pub fn compile(&self, suite: &Suite) -> Result<String> {
        if suite.checks().is_empty() {
            return Err(SentinelError::invalid_suite(
                suite.name(),
                "suite has no checks",
            ));
        }

        let base = self.render_base(suite)?;

        let mut sql = format!(
            "-- Base CTE (data source: {})\nWITH cte_{}_base AS (\n{}\n)",
            suite.data_source().source_type,
            suite.name(),
            base
        );

        for check in suite.checks() {
            let fragment = self.render_check(suite, check)?;
            sql.push_str(",\n");
            sql.push_str(&check_comment(check));
            sql.push_str(&format!("cte_{} AS (\n{}\n)", check.name(), fragment));
        }

        let union = suite
            .checks()
            .iter()
            .map(|check| format!("SELECT * FROM cte_{}", check.name()))
            .collect::<Vec<_>>()
            .join("\nUNION ALL\n");
        sql.push('\n');
        sql.push_str(&union);
        sql.push('\n');

        debug!(sql.length = sql.len(), "Suite compiled");
        Ok(sql)
    }

    /// Renders the data-source fragment with the suite's parameters.
    fn render_base(&self, suite: &Suite) -> Result<String> {
        let label = format!("{}.data_source", suite.name());
        let source = suite.data_source();

        match source.source_type {
            DataSourceType::Table => {
                let table = source.table.as_deref().unwrap_or_default();
                let table = self.engine.render(&label, table.trim(), suite.params())?;
                let quote = self.options.table_quote;
                SqlSecurity::validate_table_reference(&table, quote.quote_char())
                    .map_err(|e| SentinelError::invalid_suite(suite.name(), e.to_string()))?;
                Ok(format!("SELECT * FROM {}", quote.apply(&table)))
            }
            DataSourceType::Query => {
                let query = source.query.as_deref().unwrap_or_default();
                let query = self.engine.render(&label, query, suite.params())?;
                Ok(strip_statement_terminator(&query).to_string())
            }
        }
    }

    /// Renders one check's rule with its identity fields.
    fn render_check(&self, suite: &Suite, check: &Check) -> Result<String> {
        let rule = check
            .rule()
            .ok_or_else(|| SentinelError::MissingRuleTemplate {
                check: check.name().to_string(),
            })?;

        let params = identity_params(suite, check);
        let fragment = rule.render(&self.engine, &params)?;
        Ok(strip_statement_terminator(&fragment).to_string())
    }
}

/// Check params overlaid with the identity fields, which always win.
fn identity_params(suite: &Suite, check: &Check) -> Params {
    let mut params = check.params().clone();
    params.insert("check_name".into(), Value::from(check.name()));
    params.insert("suite_name".into(), Value::from(suite.name()));
    params.insert(
        "column_name".into(),
        check.column_name().map_or(Value::Null, Value::from),
    );
    params
}

fn check_comment(check: &Check) -> String {
    match check.description() {
        Some(description) if !description.trim().is_empty() => {
            let description = description.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("-- Check CTE: {} [{}]\n", check.name(), description)
        }
        _ => format!("-- Check CTE: {}\n", check.name()),
    }
}

fn strip_statement_terminator(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}
