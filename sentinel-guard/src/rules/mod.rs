//! Rule definitions, the template engine that renders them and the registry
//! that resolves them by name.
//!
//! A rule is split in two: a shared, immutable [`RuleDefinition`] (name,
//! description, template body, required parameters) and a per-check
//! [`RuleTemplate`] that binds a definition to default parameters.

pub mod builtin;
mod engine;
pub mod plugins;
mod registry;
mod template;

pub use engine::SqlTemplateEngine;
pub use registry::{RegistrationFn, RuleRegistry, RuleRegistryBuilder};
pub use template::{RuleDefinition, RuleTemplate};
