//! Export sinks for run results.
//!
//! An exporter receives the finalized [`RunMetadata`] and the classified
//! results verbatim. Export happens after classification and never changes the
//! outcome of a run; failures are recorded on the report instead.

mod csv;
mod json;
mod prometheus;
mod sqlite;

pub use self::csv::CsvExporter;
pub use self::json::JsonExporter;
pub use self::prometheus::PrometheusExporter;
pub use self::sqlite::SqliteExporter;

use crate::core::{CheckResult, RunMetadata};
use crate::error::{Result, SentinelError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Writes a run's results somewhere.
pub trait Exporter: Send + Sync {
    /// Short exporter name used in logs and errors.
    fn name(&self) -> &str;

    /// Exports the run and returns a description of the destination.
    fn export(&self, metadata: &RunMetadata, results: &[CheckResult]) -> Result<String>;
}

/// Built-in export formats.
///
/// Formats can be looked up by name, e.g. from configuration:
///
/// ```rust
/// use sentinel_guard::export::ExportFormat;
///
/// let format: ExportFormat = "SQLite".parse().unwrap();
/// assert_eq!(format, ExportFormat::Sqlite);
/// assert!("parquet".parse::<ExportFormat>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty JSON document
    Json,
    /// Prometheus text exposition format
    Prometheus,
    /// `<suite>_run.csv` and `<suite>_results.csv` in a directory
    Csv,
    /// Run and result tables in a SQLite database
    Sqlite,
}

impl ExportFormat {
    /// Every format, in declaration order.
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Json,
        ExportFormat::Prometheus,
        ExportFormat::Csv,
        ExportFormat::Sqlite,
    ];

    /// Creates the exporter for this format writing to `path`.
    ///
    /// `path` is a file for every format except [`Csv`](Self::Csv), where it
    /// is the output directory.
    pub fn exporter(self, path: impl Into<PathBuf>) -> Box<dyn Exporter> {
        match self {
            ExportFormat::Json => Box::new(JsonExporter::new(path)),
            ExportFormat::Prometheus => Box::new(PrometheusExporter::new(path)),
            ExportFormat::Csv => Box::new(CsvExporter::new(path)),
            ExportFormat::Sqlite => Box::new(SqliteExporter::new(path)),
        }
    }

    /// Lower-case format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Prometheus => "prometheus",
            ExportFormat::Csv => "csv",
            ExportFormat::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(ExportFormat::as_str).collect();
                SentinelError::Configuration(format!(
                    "unknown export format '{s}', expected one of: {}",
                    known.join(", ")
                ))
            })
    }
}

fn export_error(exporter: &str, message: impl fmt::Display) -> SentinelError {
    SentinelError::Export {
        exporter: exporter.to_string(),
        message: message.to_string(),
    }
}

/// Creates the parent directories of `path`.
fn ensure_parent(exporter: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| export_error(exporter, format!("{}: {e}", parent.display())))?;
    }
    Ok(())
}

/// Writes `content` to `path`, creating parent directories.
fn write_file(exporter: &str, path: &Path, content: &str) -> Result<String> {
    ensure_parent(exporter, path)?;
    fs::write(path, content)
        .map_err(|e| export_error(exporter, format!("{}: {e}", path.display())))?;
    Ok(path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names_round_trip() {
        for format in ExportFormat::ALL {
            assert_eq!(format.as_str().parse::<ExportFormat>().unwrap(), format);
            assert_eq!(format.to_string(), format.as_str());
        }
        assert_eq!(" JSON ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
    }

    #[test]
    fn test_unknown_format_lists_known_ones() {
        let err = "html".parse::<ExportFormat>().unwrap_err();
        assert!(matches!(err, SentinelError::Configuration(_)));
        assert!(err.to_string().contains("json, prometheus, csv, sqlite"));
    }

    #[test]
    fn test_exporter_names_match_formats() {
        let dir = tempfile::tempdir().unwrap();
        for format in ExportFormat::ALL {
            assert_eq!(format.exporter(dir.path().join("out")).name(), format.as_str());
        }
    }
}
