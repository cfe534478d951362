//! Rule plugins bundled with the library.
//!
//! A plugin is a plain registration function returning rule definitions. It is
//! handed to [`RuleRegistryBuilder::register`] once, when the registry is
//! built:
//!
//! ```rust
//! use sentinel_guard::rules::{plugins, RuleDefinition, RuleRegistry};
//!
//! fn team_rules() -> Vec<RuleDefinition> {
//!     vec![RuleDefinition::new(
//!         "empty_strings",
//!         "Counts empty strings",
//!         "SELECT '{{ check_name }}' AS check_name, COUNT(*) AS value FROM cte_{{ suite_name }}_base WHERE {{ column_name }} = ''",
//!     )
//!     .with_required_params(["column_name"])]
//! }
//!
//! let registry = RuleRegistry::builder()
//!     .register(plugins::bundled)
//!     .register(team_rules)
//!     .build()
//!     .unwrap();
//! assert!(registry.contains("EMPTY_STRINGS"));
//! assert!(registry.contains("greater_than"));
//! ```
//!
//! [`RuleRegistryBuilder::register`]: super::RuleRegistryBuilder::register

use super::RuleDefinition;

/// Every plugin shipped with the library.
pub fn bundled() -> Vec<RuleDefinition> {
    vec![greater_than()]
}

/// Counts values of `column_name` greater than `lower_limit_value`.
pub fn greater_than() -> RuleDefinition {
    RuleDefinition::new(
        "greater_than",
        "Counts values greater than the lower limit value",
        r"SELECT
    '{{ check_name }}' AS check_name,
    COALESCE(SUM(CASE WHEN {{ column_name }} > ({{ lower_limit_value }}) THEN 1 ELSE 0 END), 0) AS value
FROM cte_{{ suite_name }}_base",
    )
    .with_required_params(["column_name", "lower_limit_value"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::SqlTemplateEngine;

    #[test]
    fn test_bundled_plugins_are_valid() {
        let engine = SqlTemplateEngine::new();
        for definition in bundled() {
            definition.validate(&engine).unwrap();
        }
    }
}
