use super::{ensure_parent, Exporter};
use crate::core::{CheckResult, RunMetadata};
use crate::error::{Result, SentinelError};
use crate::security::SqlSecurity;
use rusqlite::{params, Connection};
use std::path::PathBuf;
use tracing::{debug, info};

const DEFAULT_RUNS_TABLE: &str = "sentinel_runs";
const DEFAULT_RESULTS_TABLE: &str = "sentinel_results";

/// Appends runs and their results to a SQLite database.
///
/// Two tables are created on first use: one row per run, and one row per
/// result referencing the run by `run_id`. Errors and extra metadata are
/// stored as JSON text. Each export is a single transaction.
#[derive(Debug, Clone)]
pub struct SqliteExporter {
    path: PathBuf,
    runs_table: String,
    results_table: String,
}

impl SqliteExporter {
    /// Creates an exporter writing to the database file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            runs_table: DEFAULT_RUNS_TABLE.to_string(),
            results_table: DEFAULT_RESULTS_TABLE.to_string(),
        }
    }

    /// Uses other table names. Both must be identifier fragments.
    pub fn with_table_names(
        mut self,
        runs_table: impl Into<String>,
        results_table: impl Into<String>,
    ) -> Result<Self> {
        let runs_table = runs_table.into();
        let results_table = results_table.into();
        SqlSecurity::validate_name_fragment(&runs_table)?;
        SqlSecurity::validate_name_fragment(&results_table)?;
        self.runs_table = runs_table;
        self.results_table = results_table;
        Ok(self)
    }

    fn create_tables(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {runs} (
                run_id INTEGER PRIMARY KEY AUTOINCREMENT,
                suite_name TEXT NOT NULL,
                job_id TEXT,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                duration_ms REAL,
                bytes_processed INTEGER,
                cache_hit INTEGER,
                validate_first INTEGER NOT NULL,
                validate_only INTEGER NOT NULL,
                error_count INTEGER NOT NULL,
                errors TEXT NOT NULL,
                extra TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {results} (
                result_id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id INTEGER NOT NULL REFERENCES {runs}(run_id),
                check_name TEXT NOT NULL,
                status TEXT NOT NULL,
                severity TEXT NOT NULL,
                value REAL,
                threshold_lower REAL,
                threshold_upper REAL,
                message TEXT NOT NULL
            );",
            runs = self.runs_table,
            results = self.results_table,
        ))
    }

    fn write(&self, conn: &mut Connection, metadata: &RunMetadata, results: &[CheckResult]) -> Result<i64> {
        self.create_tables(conn).map_err(|e| self.error(e))?;

        let errors = serde_json::to_string(&metadata.errors)?;
        let extra = serde_json::to_string(&metadata.extra)?;
        let bytes_processed = metadata
            .bytes_processed
            .map(i64::try_from)
            .transpose()
            .map_err(|e| self.error(format!("bytes_processed: {e}")))?;
        let error_count =
            i64::try_from(metadata.error_count()).map_err(|e| self.error(format!("error_count: {e}")))?;

        let tx = conn.transaction().map_err(|e| self.error(e))?;
        tx.execute(
            &format!(
                "INSERT INTO {} (suite_name, job_id, status, started_at, ended_at, duration_ms,
                    bytes_processed, cache_hit, validate_first, validate_only, error_count, errors, extra)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                self.runs_table
            ),
            params![
                metadata.suite_name,
                metadata.job_id,
                metadata.status.as_str(),
                metadata.started_at.to_rfc3339(),
                metadata.ended_at.map(|t| t.to_rfc3339()),
                metadata.duration_ms,
                bytes_processed,
                metadata.cache_hit,
                metadata.validate_first,
                metadata.validate_only,
                error_count,
                errors,
                extra,
            ],
        )
        .map_err(|e| self.error(e))?;
        let run_id = tx.last_insert_rowid();

        {
            let mut insert = tx
                .prepare(&format!(
                    "INSERT INTO {} (run_id, check_name, status, severity, value,
                        threshold_lower, threshold_upper, message)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    self.results_table
                ))
                .map_err(|e| self.error(e))?;
            for result in results {
                insert
                    .execute(params![
                        run_id,
                        result.check_name(),
                        result.status().as_str(),
                        result.severity().as_str(),
                        result.value(),
                        result.threshold_lower(),
                        result.threshold_upper(),
                        result.message(),
                    ])
                    .map_err(|e| self.error(e))?;
            }
        }

        tx.commit().map_err(|e| self.error(e))?;
        Ok(run_id)
    }

    fn error(&self, err: impl std::fmt::Display) -> SentinelError {
        SentinelError::Export {
            exporter: self.name().to_string(),
            message: err.to_string(),
        }
    }
}

impl Exporter for SqliteExporter {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn export(&self, metadata: &RunMetadata, results: &[CheckResult]) -> Result<String> {
        ensure_parent(self.name(), &self.path)?;
        let mut conn = Connection::open(&self.path).map_err(|e| self.error(e))?;
        debug!(export.database = %self.path.display(), "Opened SQLite database");

        let run_id = self.write(&mut conn, metadata, results)?;
        let destination = format!("{}#{}/{run_id}", self.path.display(), self.runs_table);
        info!(
            export.format = "sqlite",
            export.destination = %destination,
            export.results = results.len(),
            "Results exported"
        );
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CheckStatus, RunStatus, Severity, Threshold};

    fn run(suite: &str) -> (RunMetadata, Vec<CheckResult>) {
        let mut metadata = RunMetadata::start(suite, true, false);
        metadata.job_id = Some("job-7".to_string());
        metadata.bytes_processed = Some(2048);
        metadata.record_error("late partition");
        metadata.finish(RunStatus::Success);
        let results = vec![
            CheckResult::new(
                "rows",
                CheckStatus::Pass,
                Severity::Error,
                "ok",
                Some(150.0),
                &Threshold::at_least(1.0),
            ),
            CheckResult::new(
                "broken",
                CheckStatus::Error,
                Severity::Warn,
                "bad",
                None,
                &Threshold::unbounded(),
            ),
        ];
        (metadata, results)
    }

    #[test]
    fn test_export_appends_runs_and_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("quality.sqlite");
        let exporter = SqliteExporter::new(&path);

        let (metadata, results) = run("orders");
        let first = exporter.export(&metadata, &results).unwrap();
        assert!(first.ends_with("#sentinel_runs/1"));
        exporter.export(&metadata, &results[..1]).unwrap();

        let conn = Connection::open(&path).unwrap();
        let (suite, status, bytes, errors): (String, String, i64, String) = conn
            .query_row(
                "SELECT suite_name, status, bytes_processed, errors FROM sentinel_runs WHERE run_id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(suite, "orders");
        assert_eq!(status, "SUCCESS");
        assert_eq!(bytes, 2048);
        assert_eq!(errors, "[\"late partition\"]");

        let runs: i64 = conn
            .query_row("SELECT COUNT(*) FROM sentinel_runs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(runs, 2);

        let value: Option<f64> = conn
            .query_row(
                "SELECT value FROM sentinel_results WHERE run_id = 1 AND check_name = 'broken'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(value, None);

        let per_run: Vec<(i64, i64)> = conn
            .prepare("SELECT run_id, COUNT(*) FROM sentinel_results GROUP BY run_id ORDER BY run_id")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(per_run, vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn test_custom_table_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quality.sqlite");
        let exporter = SqliteExporter::new(&path)
            .with_table_names("dq_runs", "dq_results")
            .unwrap();

        let (metadata, results) = run("orders");
        exporter.export(&metadata, &results).unwrap();

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM dq_results", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_unsafe_table_name_is_rejected() {
        let err = SqliteExporter::new("unused.sqlite")
            .with_table_names("runs; DROP TABLE x", "results")
            .unwrap_err();
        assert!(matches!(err, SentinelError::SecurityError(_)));
    }
}
