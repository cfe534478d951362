//! The compile, execute and classify stages of a run.
//!
//! - [`SuiteCompiler`] turns a suite into one SQL statement.
//! - [`QueryExecutor`] is the seam to the analytical engine; [`DataFusionExecutor`]
//!   is a reference implementation.
//! - [`ResultClassifier`] maps output rows back to checks.

mod classifier;
mod compiler;
mod datafusion_executor;
mod executor;

pub use classifier::{
    extract_value, ResultClassifier, CHECK_NAME_FIELD, INVALID_VALUE_MESSAGE, VALUE_FIELDS,
};
pub use compiler::{CompilerOptions, SuiteCompiler, TableQuote};
pub use datafusion_executor::DataFusionExecutor;
pub use executor::{JobStats, QueryExecutor, QueryOutput, Row};
