//! The execution collaborator seam.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One output row: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Engine job statistics reported by a dry run or an execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStats {
    /// Engine-assigned job identifier
    pub job_id: Option<String>,
    /// Bytes scanned or produced, as reported by the engine
    pub bytes_processed: Option<u64>,
    /// Whether the engine answered from its cache
    pub cache_hit: Option<bool>,
}

/// Rows and statistics of an executed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    /// Output rows in engine order
    pub rows: Vec<Row>,
    /// Job statistics
    pub stats: JobStats,
}

/// Runs compiled statements against an analytical engine.
///
/// Implementations own their timeout and retry policy. Failures should be
/// reported as [`SentinelError::ValidationFailed`] from `dry_run` and
/// [`SentinelError::ExecutionFailed`] from `execute`, carrying any partial job
/// id and the engine's own messages; the runner records them on the run
/// rather than propagating them.
///
/// [`SentinelError::ValidationFailed`]: crate::error::SentinelError::ValidationFailed
/// [`SentinelError::ExecutionFailed`]: crate::error::SentinelError::ExecutionFailed
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Validates `sql` without running it.
    async fn dry_run(&self, sql: &str) -> Result<JobStats>;

    /// Runs `sql` and returns its rows.
    async fn execute(&self, sql: &str) -> Result<QueryOutput>;

    /// Short engine name used in logs.
    fn name(&self) -> &str {
        "executor"
    }
}
