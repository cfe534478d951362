use super::{export_error, write_file, Exporter};
use crate::core::{CheckResult, RunMetadata};
use crate::error::Result;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::info;

/// Leading columns of the run file; any other metadata keys follow by name.
const RUN_COLUMNS: &[&str] = &[
    "job_id",
    "suite_name",
    "status",
    "started_at",
    "ended_at",
    "duration_ms",
    "bytes_processed",
    "cache_hit",
    "validate_first",
    "validate_only",
    "error_count",
];

const RESULT_COLUMNS: &[&str] = &[
    "check_name",
    "status",
    "severity",
    "value",
    "threshold_lower",
    "threshold_upper",
    "message",
];

/// Writes two CSV files into a directory:
///
/// - `<suite>_run.csv`: one row of run metadata
/// - `<suite>_results.csv`: one row per result, header only when empty
///
/// The suite name is reduced to `[A-Za-z0-9._-]` for the file names.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    directory: PathBuf,
}

impl CsvExporter {
    /// Creates an exporter writing into `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Builds the run and results documents without writing them.
    pub fn render(&self, metadata: &RunMetadata, results: &[CheckResult]) -> Result<(String, String)> {
        let run = metadata.to_flat_record();
        let mut run_columns: Vec<&str> = RUN_COLUMNS.to_vec();
        run_columns.extend(
            run.keys()
                .map(String::as_str)
                .filter(|key| !RUN_COLUMNS.contains(key)),
        );
        let run_csv = self.document(&run_columns, std::iter::once(run.clone()))?;

        let results_csv = self.document(
            RESULT_COLUMNS,
            results.iter().map(CheckResult::to_flat_record),
        )?;

        Ok((run_csv, results_csv))
    }

    fn document<I>(&self, columns: &[&str], records: I) -> Result<String>
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let mut writer = ::csv::Writer::from_writer(Vec::new());
        writer
            .write_record(columns)
            .map_err(|e| export_error(self.name(), e))?;
        for record in records {
            writer
                .write_record(columns.iter().map(|column| cell(record.get(*column))))
                .map_err(|e| export_error(self.name(), e))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| export_error(self.name(), e))?;
        String::from_utf8(bytes).map_err(|e| export_error(self.name(), e))
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn file_stem(suite_name: &str) -> String {
    suite_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl Exporter for CsvExporter {
    fn name(&self) -> &str {
        "csv"
    }

    fn export(&self, metadata: &RunMetadata, results: &[CheckResult]) -> Result<String> {
        let (run_csv, results_csv) = self.render(metadata, results)?;
        let stem = file_stem(&metadata.suite_name);

        let run_path = self.directory.join(format!("{stem}_run.csv"));
        let results_path = self.directory.join(format!("{stem}_results.csv"));
        write_file(self.name(), &run_path, &run_csv)?;
        write_file(self.name(), &results_path, &results_csv)?;

        info!(
            export.format = "csv",
            export.run_file = %run_path.display(),
            export.results_file = %results_path.display(),
            export.results = results.len(),
            "Results exported"
        );
        Ok(self.directory.display().to_string())
    }
}
