use super::{write_file, Exporter};
use crate::core::{CheckResult, RunMetadata};
use crate::error::{Result, SentinelError};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

const CHECK_VALUE: &str = "sentinel_check_value";
const RUN_DURATION: &str = "sentinel_run_duration_ms";
const RUN_ERRORS: &str = "sentinel_run_error_count";

/// Writes results in the Prometheus text exposition format, e.g. for the node
/// exporter's textfile collector.
///
/// ```text
/// sentinel_check_value{check="rows",severity="ERROR",status="PASS",suite="orders"} 150
/// ```
///
/// Checks without a value are written as `NaN`. Extra labels are added to
/// every series; the built-in labels win on a name clash.
#[derive(Debug, Clone)]
pub struct PrometheusExporter {
    path: PathBuf,
    labels: BTreeMap<String, String>,
}

impl PrometheusExporter {
    /// Creates an exporter writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Adds a label to every series.
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    /// Builds the exposition text without writing it.
    pub fn render(&self, metadata: &RunMetadata, results: &[CheckResult]) -> Result<String> {
        let registry = self.registry(metadata, results).map_err(|e| self.error(e))?;

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .map_err(|e| self.error(e))?;
        String::from_utf8(buffer).map_err(|e| self.error(e))
    }

    fn registry(
        &self,
        metadata: &RunMetadata,
        results: &[CheckResult],
    ) -> prometheus::Result<Registry> {
        let registry = Registry::new();
        let suite = metadata.suite_name.as_str();

        let check_value = self.gauge(
            &registry,
            CHECK_VALUE,
            "Measured value of a data-quality check",
            &["suite", "check", "status", "severity"],
        )?;
        for result in results {
            check_value
                .get_metric_with_label_values(&[
                    suite,
                    result.check_name(),
                    result.status().as_str(),
                    result.severity().as_str(),
                ])?
                .set(result.value().unwrap_or(f64::NAN));
        }

        self.gauge(
            &registry,
            RUN_DURATION,
            "Duration of the data-quality run in milliseconds",
            &["suite", "status"],
        )?
        .get_metric_with_label_values(&[suite, metadata.status.as_str()])?
        .set(metadata.duration_ms.unwrap_or_default());

        self.gauge(
            &registry,
            RUN_ERRORS,
            "Errors recorded during the data-quality run",
            &["suite"],
        )?
        .get_metric_with_label_values(&[suite])?
        .set(metadata.error_count() as f64);

        Ok(registry)
    }

    /// Registers a gauge family carrying the extra labels not shadowed by
    /// `label_names`.
    fn gauge(
        &self,
        registry: &Registry,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> prometheus::Result<GaugeVec> {
        let const_labels = self
            .labels
            .iter()
            .filter(|(label, _)| !label_names.contains(&label.as_str()))
            .map(|(label, value)| (label.clone(), value.clone()))
            .collect();

        let gauge = GaugeVec::new(Opts::new(name, help).const_labels(const_labels), label_names)?;
        registry.register(Box::new(gauge.clone()))?;
        Ok(gauge)
    }

    fn error(&self, err: impl std::fmt::Display) -> SentinelError {
        SentinelError::Export {
            exporter: self.name().to_string(),
            message: err.to_string(),
        }
    }
}

impl Exporter for PrometheusExporter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn export(&self, metadata: &RunMetadata, results: &[CheckResult]) -> Result<String> {
        let content = self.render(metadata, results)?;
        let destination = write_file(self.name(), &self.path, &content)?;
        info!(
            export.format = "prometheus",
            export.destination = %destination,
            export.results = results.len(),
            "Results exported"
        );
        Ok(destination)
    }
}
