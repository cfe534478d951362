//! Suites and rules loaded from JSON files on disk.

use sentinel_guard::prelude::*;
use sentinel_guard::rules::plugins;
use std::fs;

const BLANK_RULES: &str = r#"[
  {
    "name": "blank_strings",
    "description": "Counts blank strings",
    "template": "SELECT '{{ check_name }}' AS check_name, COUNT(*) AS value FROM cte_{{ suite_name }}_base WHERE TRIM({{ column_name }}) = ''",
    "required_params": ["column_name"]
  }
]"#;

const SUITE: &str = r#"{
  "name": "customers",
  "domain": "crm",
  "data_source": {"type": "TABLE", "table": "{{ project }}.crm.customers"},
  "params": {"project": "acme"},
  "checks": [
    {"name": "names_not_blank", "rule": "BLANK_STRINGS", "column_name": "name",
     "severity": "WARN", "threshold": {"upper": 0}},
    {"name": "big_spenders", "rule": "greater_than", "column_name": "lifetime_value",
     "rule_params": {"lower_limit_value": 10000}},
    {"name": "email_format", "rule": "regex_match", "column_name": "email",
     "rule_params": {"regex_pattern": "^[^@]+@[^@]+$"}}
  ]
}"#;

#[test]
fn test_suite_from_files_with_directory_rules() {
    let dir = tempfile::tempdir().unwrap();
    let rules_dir = dir.path().join("rules");
    fs::create_dir(&rules_dir).unwrap();
    fs::write(rules_dir.join("blank.json"), BLANK_RULES).unwrap();
    let suite_path = dir.path().join("customers.json");
    fs::write(&suite_path, SUITE).unwrap();

    let registry = RuleRegistry::builder()
        .register(plugins::bundled)
        .rule_directory(&rules_dir)
        .build()
        .unwrap();
    assert_eq!(registry.plugin_count(), 2);

    let suite = SuiteDefinition::from_path(&suite_path)
        .unwrap()
        .into_suite(&registry)
        .unwrap();
    assert_eq!(suite.domain(), Some("crm"));
    assert_eq!(suite.check("names_not_blank").unwrap().severity(), Severity::Warn);

    let sql = SuiteCompiler::new().compile(&suite).unwrap();
    assert!(sql.contains("SELECT * FROM `acme.crm.customers`"));
    assert!(sql.contains("WHERE TRIM(name) = ''"));
    assert!(sql.contains("WHEN lifetime_value > (10000)"));
    assert!(sql.contains("REGEXP_CONTAINS(email, r'^[^@]+@[^@]+$')"));
}

#[test]
fn test_rule_outside_registry_is_not_found() {
    let registry = RuleRegistry::builtin_only();
    let err = SuiteDefinition::from_json_str(SUITE)
        .unwrap()
        .into_suite(&registry)
        .unwrap_err();
    assert!(matches!(err, SentinelError::RuleNotFound { name } if name == "BLANK_STRINGS"));
}

#[test]
fn test_duplicate_checks_in_definition_are_rejected() {
    let json = r#"{"name": "s", "data_source": {"table": "t"}, "checks": [
        {"name": "rows", "rule": "row_count"},
        {"name": "rows", "rule": "row_count"}
    ]}"#;
    let err = SuiteDefinition::from_json_str(json)
        .unwrap()
        .into_suite(RuleRegistry::global())
        .unwrap_err();
    assert!(matches!(err, SentinelError::InvalidSuiteDefinition { .. }));
    assert!(err.to_string().contains("duplicate check name 'rows'"));
}

#[test]
fn test_missing_suite_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(SuiteDefinition::from_path(dir.path().join("absent.json")).is_err());
}

#[test]
fn test_broken_rule_file_fails_registry_build() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let err = RuleRegistry::builder()
        .rule_directory(dir.path())
        .build()
        .unwrap_err();
    assert!(matches!(err, SentinelError::Configuration(_)));
}

#[test]
fn test_definition_round_trips_through_serde() {
    let definition = SuiteDefinition::from_json_str(SUITE).unwrap();
    let json = serde_json::to_string(&definition).unwrap();
    assert_eq!(SuiteDefinition::from_json_str(&json).unwrap(), definition);
}
