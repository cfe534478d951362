//! Reference executor running compiled suites on DataFusion.

use super::{JobStats, QueryExecutor, QueryOutput, Row};
use crate::error::{Result, SentinelError};
use arrow::json::ArrayWriter;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::Utc;
use datafusion::prelude::SessionContext;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

/// Executes statements against a DataFusion [`SessionContext`].
///
/// Tables must be registered on the context before a suite referencing them
/// runs. DataFusion reads a backtick-quoted dotted name as one identifier, so
/// suites over registered tables are usually compiled with
/// [`TableQuote::None`](super::TableQuote::None).
///
/// # Examples
///
/// ```rust,no_run
/// use sentinel_guard::engine::{DataFusionExecutor, QueryExecutor};
/// use datafusion::prelude::SessionContext;
///
/// # async fn example() -> sentinel_guard::error::Result<()> {
/// let executor = DataFusionExecutor::new(SessionContext::new());
/// let output = executor.execute("SELECT 'a' AS check_name, 1 AS value").await?;
/// assert_eq!(output.rows.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct DataFusionExecutor {
    ctx: SessionContext,
}

impl std::fmt::Debug for DataFusionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFusionExecutor")
            .field("session_id", &self.ctx.session_id())
            .finish()
    }
}

impl DataFusionExecutor {
    /// Wraps an existing session.
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Returns the session, e.g. to register tables.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// A job id made of a digest prefix of the statement and the current time.
    fn job_id(sql: &str) -> String {
        let digest = Sha256::digest(sql.as_bytes());
        format!(
            "datafusion_{}_{}",
            hex::encode(&digest[..8]),
            Utc::now().timestamp_millis()
        )
    }
}

#[async_trait]
impl QueryExecutor for DataFusionExecutor {
    /// Plans the statement without executing it. DataFusion gives no scan
    /// estimate, so `bytes_processed` is left unset.
    #[instrument(skip(self, sql), fields(sql.length = sql.len()))]
    async fn dry_run(&self, sql: &str) -> Result<JobStats> {
        let job_id = Self::job_id(sql);
        self.ctx
            .state()
            .create_logical_plan(sql)
            .await
            .map_err(|e| SentinelError::ValidationFailed {
                message: "statement could not be planned".to_string(),
                job_id: Some(job_id.clone()),
                engine_errors: vec![e.to_string()],
            })?;

        debug!(job.id = %job_id, "Dry run planned successfully");
        Ok(JobStats {
            job_id: Some(job_id),
            bytes_processed: None,
            cache_hit: Some(false),
        })
    }

    #[instrument(skip(self, sql), fields(sql.length = sql.len()))]
    async fn execute(&self, sql: &str) -> Result<QueryOutput> {
        let job_id = Self::job_id(sql);
        let failed = |stage: &str, engine_error: String| SentinelError::ExecutionFailed {
            message: format!("statement failed during {stage}"),
            job_id: Some(job_id.clone()),
            engine_errors: vec![engine_error],
        };

        let df = self
            .ctx
            .sql(sql)
            .await
            .map_err(|e| failed("planning", e.to_string()))?;
        let batches = df
            .collect()
            .await
            .map_err(|e| failed("execution", e.to_string()))?;

        let bytes_processed: usize = batches
            .iter()
            .map(|batch| batch.get_array_memory_size())
            .sum();
        let rows =
            batches_to_rows(&batches).map_err(|e| failed("row conversion", e.to_string()))?;

        debug!(
            job.id = %job_id,
            job.rows = rows.len(),
            job.bytes_processed = bytes_processed,
            "Statement executed"
        );

        Ok(QueryOutput {
            rows,
            stats: JobStats {
                job_id: Some(job_id),
                bytes_processed: Some(bytes_processed as u64),
                cache_hit: Some(false),
            },
        })
    }

    fn name(&self) -> &str {
        "datafusion"
    }
}

/// Converts record batches to JSON rows. Null cells are omitted from a row.
fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Row>> {
    let mut writer = ArrayWriter::new(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer
        .write_batches(&refs)
        .map_err(|e| SentinelError::Serialization(e.to_string()))?;
    writer
        .finish()
        .map_err(|e| SentinelError::Serialization(e.to_string()))?;

    let buffer = writer.into_inner();
    if buffer.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_execute_returns_json_rows() {
        let executor = DataFusionExecutor::default();
        let output = executor
            .execute("SELECT 'a' AS check_name, 150 AS value UNION ALL SELECT 'b', 2")
            .await
            .unwrap();

        assert_eq!(output.rows.len(), 2);
        let a = output
            .rows
            .iter()
            .find(|row| row["check_name"] == json!("a"))
            .unwrap();
        assert_eq!(a["value"], json!(150));
        assert!(output.stats.job_id.unwrap().starts_with("datafusion_"));
        assert_eq!(output.stats.cache_hit, Some(false));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_need_data() {
        let executor = DataFusionExecutor::default();
        let stats = executor.dry_run("SELECT 1 AS value").await.unwrap();
        assert!(stats.job_id.is_some());
    }

    #[tokio::test]
    async fn test_unknown_table_fails_validation() {
        let executor = DataFusionExecutor::default();
        let err = executor
            .dry_run("SELECT * FROM no_such_table")
            .await
            .unwrap_err();

        match err {
            SentinelError::ValidationFailed {
                job_id,
                engine_errors,
                ..
            } => {
                assert!(job_id.is_some());
                assert_eq!(engine_errors.len(), 1);
                assert!(engine_errors[0].contains("no_such_table"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = executor
            .execute("SELECT * FROM no_such_table")
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::ExecutionFailed { .. }));
    }

    #[test]
    fn test_job_id_prefix_is_stable() {
        let a = DataFusionExecutor::job_id("SELECT 1");
        let b = DataFusionExecutor::job_id("SELECT 1");
        assert_eq!(a[..27], b[..27]);
    }
}
