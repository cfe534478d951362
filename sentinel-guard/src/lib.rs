//! # Sentinel - SQL Data-Quality Checks for Rust
//!
//! Sentinel compiles a suite of data-quality checks into a single SQL statement,
//! runs it through a pluggable query engine and classifies every measured value
//! against the check's threshold. A DataFusion engine ships with the crate.
//!
//! ## Overview
//!
//! A [`Suite`](core::Suite) names one data source (a table or a query) and a
//! list of [`Check`](core::Check)s. Each check points at a parameterized SQL
//! rule such as `not_null` or `row_count`. The compiler turns the suite into one
//! `WITH ... UNION ALL` statement with one CTE per check, so the data source is
//! scanned in a single query.
//!
//! ## Quick Start
//!
//! ```rust
//! use sentinel_guard::prelude::*;
//!
//! let suite = Suite::builder("orders", DataSource::table("shop.orders"))
//!     .check(
//!         Check::builder("id_not_null")
//!             .rule(builtin::not_null())
//!             .column("id")
//!             .severity(Severity::Critical)
//!             .threshold(Threshold::exact(0.0))
//!             .build(),
//!     )
//!     .check(
//!         Check::builder("has_rows")
//!             .rule(builtin::row_count())
//!             .threshold(Threshold::at_least(1.0))
//!             .build(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let sql = SuiteCompiler::new().compile(&suite).unwrap();
//! assert!(sql.contains("WITH cte_orders_base AS"));
//! assert!(sql.contains("UNION ALL"));
//! ```
//!
//! Running the suite needs an executor. With DataFusion:
//!
//! ```rust,no_run
//! use sentinel_guard::prelude::*;
//! use datafusion::prelude::SessionContext;
//!
//! # async fn example(suite: Suite) -> sentinel_guard::error::Result<()> {
//! let runner = SentinelRunner::new(DataFusionExecutor::new(SessionContext::new()))
//!     .with_exporter(JsonExporter::new("out/orders.json"));
//! let report = runner.run_suite(&suite, &RunOptions::default()).await?;
//! for result in report.failed_results() {
//!     println!("{}: {}", result.check_name(), result.message());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Rules
//!
//! Built-in rules live in [`rules::builtin`]. Extra rules come from
//! registration functions ([`rules::plugins`]) or JSON descriptor files loaded
//! through a [`RuleRegistry`](rules::RuleRegistry). Suites can also be written
//! as JSON and loaded with [`definition::SuiteDefinition`].
//!
//! ## Architecture
//!
//! - **`core`**: suites, checks, thresholds, severities, results and run metadata
//! - **`rules`**: rule definitions, the template engine and the rule registry
//! - **`engine`**: suite compiler, query executors and the result classifier
//! - **`runner`**: the run state machine tying compile, dry run, execute and classify together
//! - **`export`**: JSON, Prometheus textfile, CSV and SQLite sinks
//! - **`definition`**: JSON suite definitions
//! - **`security`**: identifier, table reference and regex validation
//! - **`logging`**: log verbosity control and subscriber setup
//!
//! ## Logging
//!
//! The crate logs through `tracing`. Applications install a subscriber, or use
//! [`logging::setup::init_logging`]:
//!
//! ```rust,no_run
//! use sentinel_guard::logging::setup::{init_logging, LoggingConfig};
//!
//! init_logging(LoggingConfig::default()).unwrap();
//! ```

pub mod core;
pub mod definition;
pub mod engine;
pub mod error;
pub mod export;
pub mod logging;
pub mod prelude;
pub mod rules;
pub mod runner;
pub mod security;

pub use error::{Result, SentinelError};
