use super::{write_file, Exporter};
use crate::core::{CheckResult, RunMetadata};
use crate::error::Result;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;

/// Writes `{ "metadata": ..., "results": [...] }` as pretty JSON.
///
/// Both parts use the flat record shapes of [`RunMetadata::to_flat_record`]
/// and [`CheckResult::to_flat_record`].
#[derive(Debug, Clone)]
pub struct JsonExporter {
    path: PathBuf,
}

impl JsonExporter {
    /// Creates an exporter writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Builds the JSON document without writing it.
    pub fn render(&self, metadata: &RunMetadata, results: &[CheckResult]) -> Result<String> {
        let document = json!({
            "metadata": Value::Object(metadata.to_flat_record()),
            "results": results
                .iter()
                .map(|r| Value::Object(r.to_flat_record()))
                .collect::<Vec<_>>(),
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

impl Exporter for JsonExporter {
    fn name(&self) -> &str {
        "json"
    }

    fn export(&self, metadata: &RunMetadata, results: &[CheckResult]) -> Result<String> {
        let content = self.render(metadata, results)?;
        let destination = write_file(self.name(), &self.path, &content)?;
        info!(
            export.format = "json",
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

    #[test]
    fn test_export_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.json");

        let mut metadata = RunMetadata::start("orders", true, false);
        metadata.finish(RunStatus::Success);
        let results = vec![CheckResult::new(
            "rows",
            CheckStatus::Pass,
            Severity::Error,
            "rows: value 3 within no threshold",
            Some(3.0),
            &Threshold::unbounded(),
        )];

        let destination = JsonExporter::new(&path).export(&metadata, &results).unwrap();
        assert_eq!(destination, path.display().to_string());

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["metadata"]["suite_name"], "orders");
        assert_eq!(written["metadata"]["status"], "SUCCESS");
        assert_eq!(written["metadata"]["error_count"], 0);
        assert_eq!(written["results"][0]["check_name"], "rows");
        assert_eq!(written["results"][0]["value"], 3.0);
    }
}
