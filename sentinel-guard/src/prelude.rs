//! Prelude for commonly used types and traits in sentinel-guard.

pub use crate::core::{
    Check, CheckResult, CheckStatus, DataSource, DataSourceType, Params, RunMetadata, RunStatus,
    Severity, Suite, Threshold,
};
pub use crate::definition::{CheckDefinition, SuiteDefinition};
pub use crate::engine::{
    CompilerOptions, DataFusionExecutor, QueryExecutor, ResultClassifier, SuiteCompiler,
    TableQuote,
};
pub use crate::error::{ErrorContext, Result, SentinelError};
pub use crate::export::{
    CsvExporter, ExportFormat, Exporter, JsonExporter, PrometheusExporter, SqliteExporter,
};
pub use crate::logging::LogConfig;
pub use crate::rules::{builtin, RuleDefinition, RuleRegistry, RuleTemplate, SqlTemplateEngine};
pub use crate::runner::{RunOptions, RunReport, SentinelRunner};
