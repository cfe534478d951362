//! Core data model: what to check and what was found.
//!
//! ```text
//! Suite (DataSource, params)
//!     ├── Check ── RuleTemplate, Severity, Threshold
//!     └── Check ── RuleTemplate, Severity, Threshold
//!
//! run ──► RunMetadata + [CheckResult, ...]
//! ```
//!
//! Suites and checks are caller-owned and read-only once built. Results and
//! run metadata are produced by the pipeline and handed to exporters.

mod check;
mod flatten;
mod result;
mod severity;
mod status;
mod suite;
mod threshold;

pub use check::{Check, CheckBuilder};
pub use flatten::flatten_object;
pub use result::{CheckResult, RunMetadata};
pub use severity::Severity;
pub use status::{CheckStatus, RunStatus};
pub use suite::{DataSource, DataSourceType, Suite, SuiteBuilder};
pub use threshold::Threshold;

/// Parameter map passed to rule templates.
pub type Params = serde_json::Map<String, serde_json::Value>;
