//! Orchestration of one suite run.
//!
//! ```text
//! COMPILE ──► VALIDATE? ──► (stop if validate_only) ──► EXECUTE ──► CLASSIFY ──► EXPORT?
//! ```
//!
//! Compilation errors are returned to the caller. Engine failures end the run
//! early with a failure status on [`RunMetadata`] and no results.

use crate::core::{flatten_object, CheckResult, Params, RunMetadata, RunStatus, Severity, Suite};
use crate::engine::{JobStats, QueryExecutor, ResultClassifier, Row, SuiteCompiler};
use crate::error::{Result, SentinelError};
use crate::export::Exporter;
use crate::log_job_stats;
use crate::logging::{truncate_field, LogConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Per-run options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Dry-run the statement before executing it
    pub validate_first: bool,
    /// Stop after the dry run; implies a dry run
    pub validate_only: bool,
    /// Flatten nested row values into dotted keys before classification
    pub flatten_rows: bool,
    /// Hand results to the configured exporter
    pub export: bool,
    /// Free-form values copied into [`RunMetadata::extra`]
    pub extra: Params,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            validate_first: true,
            validate_only: false,
            flatten_rows: false,
            export: true,
            extra: Params::new(),
        }
    }
}

impl RunOptions {
    /// Options for a dry run only.
    pub fn validate_only() -> Self {
        Self {
            validate_only: true,
            ..Self::default()
        }
    }

    /// Sets whether to dry-run first.
    pub fn with_validate_first(mut self, enabled: bool) -> Self {
        self.validate_first = enabled;
        self
    }

    /// Sets whether to flatten nested rows.
    pub fn with_flatten_rows(mut self, enabled: bool) -> Self {
        self.flatten_rows = enabled;
        self
    }

    /// Sets whether to export.
    pub fn with_export(mut self, enabled: bool) -> Self {
        self.export = enabled;
        self
    }

    /// Adds an entry to the run metadata's `extra` map.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    fn dry_run(&self) -> bool {
        self.validate_first || self.validate_only
    }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The compiled statement
    pub sql: String,
    /// Finalized run metadata
    pub metadata: RunMetadata,
    /// Classified results, in output row order
    pub results: Vec<CheckResult>,
    /// Set when the exporter failed; the run outcome is unaffected
    pub export_error: Option<String>,
}

impl RunReport {
    /// True when the run ended successfully and every check passed.
    pub fn is_success(&self) -> bool {
        matches!(
            self.metadata.status,
            RunStatus::Success | RunStatus::ValidationSuccess
        ) && self.results.iter().all(CheckResult::is_pass)
    }

    /// Results with status `FAIL` or `ERROR`.
    pub fn failed_results(&self) -> Vec<&CheckResult> {
        self.results
            .iter()
            .filter(|result| result.status().is_fail())
            .collect()
    }

    /// The most severe severity among failed results.
    pub fn highest_failed_severity(&self) -> Option<Severity> {
        self.failed_results()
            .into_iter()
            .map(CheckResult::severity)
            .max()
    }
}

/// Runs suites against a [`QueryExecutor`].
///
/// A runner holds no per-run state, so one instance can serve concurrent runs.
///
/// # Examples
///
/// ```rust,no_run
/// use sentinel_guard::prelude::*;
/// use datafusion::prelude::SessionContext;
///
/// # async fn example() -> sentinel_guard::error::Result<()> {
/// let ctx = SessionContext::new();
/// // ... register the `orders` table ...
///
/// let suite = Suite::builder("orders", DataSource::table("orders"))
///     .check(
///         Check::builder("has_rows")
///             .rule(builtin::row_count())
///             .threshold(Threshold::at_least(1.0))
///             .build(),
///     )
///     .build()?;
///
/// let runner = SentinelRunner::new(DataFusionExecutor::new(ctx)).with_compiler(
///     SuiteCompiler::with_options(CompilerOptions::default().with_table_quote(TableQuote::None)),
/// );
/// let report = runner.run_suite(&suite, &RunOptions::default()).await?;
/// println!("{} -> {:?}", report.metadata.status, report.failed_results());
/// # Ok(())
/// # }
/// ```
pub struct SentinelRunner {
    executor: Arc<dyn QueryExecutor>,
    compiler: SuiteCompiler,
    exporter: Option<Box<dyn Exporter>>,
    log_config: LogConfig,
}

impl SentinelRunner {
    /// Creates a runner with the default compiler and no exporter.
    pub fn new<E: QueryExecutor + 'static>(executor: E) -> Self {
        Self::from_shared(Arc::new(executor))
    }

    /// Creates a runner around a shared executor.
    pub fn from_shared(executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            executor,
            compiler: SuiteCompiler::new(),
            exporter: None,
            log_config: LogConfig::default(),
        }
    }

    /// Replaces the compiler.
    pub fn with_compiler(mut self, compiler: SuiteCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Sets the exporter.
    pub fn with_exporter(mut self, exporter: impl Exporter + 'static) -> Self {
        self.exporter = Some(Box::new(exporter));
        self
    }

    /// Sets a boxed exporter, e.g. from [`ExportFormat::exporter`].
    ///
    /// [`ExportFormat::exporter`]: crate::export::ExportFormat::exporter
    pub fn with_boxed_exporter(mut self, exporter: Box<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Compiles `suite` without running it.
    pub fn compile(&self, suite: &Suite) -> Result<String> {
        self.compiler.compile(suite)
    }

    /// Runs `suite` once.
    ///
    /// # Errors
    ///
    /// Only compilation errors are returned. Dry-run and execution failures are
    /// recorded on the report's metadata with status `VALIDATION_FAILED` or
    /// `FAILED`.
    #[instrument(skip(self, suite, options), fields(
        suite.name = %suite.name(),
        executor = %self.executor.name(),
        run.validate_first = options.validate_first,
        run.validate_only = options.validate_only
    ))]
    pub async fn run_suite(&self, suite: &Suite, options: &RunOptions) -> Result<RunReport> {
        let sql = self.compiler.compile(suite)?;
        if self.log_config.log_sql {
            info!(
                sql = %truncate_field(&sql, self.log_config.max_field_length),
                "Compiled suite"
            );
        }

        let mut metadata =
            RunMetadata::start(suite.name(), options.validate_first, options.validate_only);
        metadata.extra = options.extra.clone();

        if options.dry_run() {
            match self.executor.dry_run(&sql).await {
                Ok(stats) => {
                    self.apply_stats(&mut metadata, stats);
                    if options.validate_only {
                        metadata.finish(RunStatus::ValidationSuccess);
                        info!(run.status = %metadata.status, "Validation-only run finished");
                        return Ok(Self::report(sql, metadata, Vec::new()));
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Dry run failed");
                    Self::record_failure(&mut metadata, &err);
                    metadata.finish(RunStatus::ValidationFailed);
                    return Ok(Self::report(sql, metadata, Vec::new()));
                }
            }
        }

        let output = match self.executor.execute(&sql).await {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "Execution failed");
                Self::record_failure(&mut metadata, &err);
                metadata.finish(RunStatus::Failed);
                return Ok(Self::report(sql, metadata, Vec::new()));
            }
        };
        self.apply_stats(&mut metadata, output.stats);

        let rows: Vec<Row> = if options.flatten_rows {
            output.rows.iter().map(flatten_object).collect()
        } else {
            output.rows
        };

        let results = ResultClassifier::new()
            .with_log_config(self.log_config.clone())
            .classify(suite, &rows);
        metadata.finish(RunStatus::Success);

        let failed = results.iter().filter(|r| r.status().is_fail()).count();
        info!(
            run.status = %metadata.status,
            run.rows = rows.len(),
            run.results = results.len(),
            run.failed = failed,
            run.duration_ms = metadata.duration_ms.unwrap_or_default(),
            "Suite run finished"
        );

        let mut report = Self::report(sql, metadata, results);
        if options.export {
            report.export_error = self.export(&report);
        }
        Ok(report)
    }

    fn apply_stats(&self, metadata: &mut RunMetadata, stats: JobStats) {
        log_job_stats!(
            self.log_config,
            job.id = ?stats.job_id,
            job.bytes_processed = ?stats.bytes_processed,
            job.cache_hit = ?stats.cache_hit,
            "Engine job stats"
        );
        if stats.job_id.is_some() {
            metadata.job_id = stats.job_id;
        }
        if stats.bytes_processed.is_some() {
            metadata.bytes_processed = stats.bytes_processed;
        }
        if stats.cache_hit.is_some() {
            metadata.cache_hit = stats.cache_hit;
        }
    }

    fn record_failure(metadata: &mut RunMetadata, err: &SentinelError) {
        if let Some(job_id) = err.job_id() {
            metadata.job_id = Some(job_id.to_string());
        }
        for message in err.messages() {
            metadata.record_error(message);
        }
    }

    fn export(&self, report: &RunReport) -> Option<String> {
        let exporter = self.exporter.as_ref()?;
        match exporter.export(&report.metadata, &report.results) {
            Ok(destination) => {
                info!(export.exporter = exporter.name(), export.destination = %destination, "Export complete");
                None
            }
            Err(err) => {
                warn!(export.exporter = exporter.name(), error = %err, "Export failed");
                Some(err.to_string())
            }
        }
    }

    fn report(sql: String, metadata: RunMetadata, results: Vec<CheckResult>) -> RunReport {
        RunReport {
            sql,
            metadata,
            results,
            export_error: None,
        }
    }
}

impl std::fmt::Debug for SentinelRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentinelRunner")
            .field("executor", &self.executor.name())
            .field("compiler", &self.compiler)
            .field("exporter", &self.exporter.as_ref().map(|e| e.name()))
            .finish()
    }
}
