//! End-to-end runs against an in-memory DataFusion table.

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use sentinel_guard::prelude::*;
use std::sync::Arc;

fn orders_context() -> SessionContext {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("amount", DataType::Float64, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("email", DataType::Utf8, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])),
            Arc::new(Float64Array::from(vec![10.0, 25.5, -3.0, 1500.0, 40.0])),
            Arc::new(StringArray::from(vec!["new", "paid", "paid", "shipped", "new"])),
            Arc::new(StringArray::from(vec![
                Some("a@example.com"),
                None,
                Some("c@example.com"),
                Some("d@example.com"),
                Some("e@example.com"),
            ])),
        ],
    )
    .unwrap();

    let ctx = SessionContext::new();
    let table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    ctx.register_table("orders", Arc::new(table)).unwrap();
    ctx
}

fn runner(ctx: SessionContext) -> SentinelRunner {
    SentinelRunner::new(DataFusionExecutor::new(ctx)).with_compiler(SuiteCompiler::with_options(
        CompilerOptions::default().with_table_quote(TableQuote::None),
    ))
}

fn orders_suite() -> Suite {
    let big_orders = RuleRegistry::global()
        .resolve("greater_than")
        .unwrap()
        .with_param("lower_limit_value", 1000);

    Suite::builder("orders", DataSource::table("orders"))
        .owner("data-platform")
        .checks([
            Check::builder("id_not_null")
                .rule(builtin::not_null())
                .column("id")
                .severity(Severity::Critical)
                .threshold(Threshold::exact(0.0))
                .build(),
            Check::builder("id_unique")
                .rule(builtin::unique())
                .column("id")
                .threshold(Threshold::exact(0.0))
                .build(),
            Check::builder("has_rows")
                .rule(builtin::row_count())
                .threshold(Threshold::at_least(1.0))
                .build(),
            Check::builder("no_negative_amounts")
                .rule(builtin::negative_values())
                .column("amount")
                .severity(Severity::Critical)
                .threshold(Threshold::exact(0.0))
                .build(),
            Check::builder("email_null_ratio")
                .rule(builtin::null_ratio())
                .column("email")
                .threshold(Threshold::at_most(0.25))
                .build(),
            Check::builder("amount_range")
                .rule(builtin::value_range(0.0, 1000.0))
                .column("amount")
                .severity(Severity::Warn)
                .threshold(Threshold::exact(0.0))
                .build(),
            Check::builder("status_values")
                .rule(builtin::accepted_values(["new", "paid"]))
                .column("status")
                .threshold(Threshold::at_most(1.0))
                .build(),
            Check::builder("big_orders")
                .rule(big_orders)
                .column("amount")
                .severity(Severity::Info)
                .threshold(Threshold::exact(0.0))
                .build(),
        ])
        .build()
        .unwrap()
}

fn result<'a>(report: &'a RunReport, name: &str) -> &'a CheckResult {
    report
        .results
        .iter()
        .find(|r| r.check_name() == name)
        .unwrap_or_else(|| panic!("no result for {name}"))
}

#[tokio::test]
async fn test_full_run_classifies_every_check() {
    let report = runner(orders_context())
        .run_suite(&orders_suite(), &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.metadata.status, RunStatus::Success);
    assert!(report.metadata.job_id.as_deref().unwrap().starts_with("datafusion_"));
    assert!(report.metadata.duration_ms.is_some());
    assert_eq!(report.metadata.error_count(), 0);
    assert_eq!(report.results.len(), 8);

    let expectations = [
        ("id_not_null", 0.0, CheckStatus::Pass),
        ("id_unique", 0.0, CheckStatus::Pass),
        ("has_rows", 5.0, CheckStatus::Pass),
        ("no_negative_amounts", 1.0, CheckStatus::Fail),
        ("amount_range", 2.0, CheckStatus::Fail),
        ("status_values", 1.0, CheckStatus::Pass),
        ("big_orders", 1.0, CheckStatus::Fail),
    ];
    for (name, value, status) in expectations {
        let r = result(&report, name);
        assert_eq!(r.value(), Some(value), "value of {name}");
        assert_eq!(r.status(), status, "status of {name}");
    }

    let ratio = result(&report, "email_null_ratio");
    assert!((ratio.value().unwrap() - 0.2).abs() < 1e-9);
    assert_eq!(ratio.status(), CheckStatus::Pass);

    assert!(!report.is_success());
    assert_eq!(report.failed_results().len(), 3);
    assert_eq!(report.highest_failed_severity(), Some(Severity::Critical));
}

#[tokio::test]
async fn test_query_data_source() {
    let suite = Suite::builder(
        "paid_orders",
        DataSource::query("SELECT * FROM orders WHERE status = '{{ wanted }}';"),
    )
    .param("wanted", "paid")
    .check(
        Check::builder("paid_rows")
            .rule(builtin::row_count())
            .threshold(Threshold::exact(2.0))
            .build(),
    )
    .build()
    .unwrap();

    let report = runner(orders_context())
        .run_suite(&suite, &RunOptions::default().with_validate_first(false))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.results[0].value(), Some(2.0));
}

#[tokio::test]
async fn test_validate_only_skips_execution() {
    let report = runner(orders_context())
        .run_suite(&orders_suite(), &RunOptions::validate_only())
        .await
        .unwrap();

    assert_eq!(report.metadata.status, RunStatus::ValidationSuccess);
    assert!(report.metadata.validate_only);
    assert!(report.results.is_empty());
    assert!(report.is_success());
}

#[tokio::test]
async fn test_missing_table_fails_validation() {
    let suite = Suite::builder("ghost", DataSource::table("no_such_table"))
        .check(Check::builder("rows").rule(builtin::row_count()).build())
        .build()
        .unwrap();

    let report = runner(SessionContext::new())
        .run_suite(&suite, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(report.metadata.status, RunStatus::ValidationFailed);
    assert!(report.metadata.error_count() >= 1);
    assert!(report.metadata.job_id.is_some());
    assert!(report.results.is_empty());
}

#[tokio::test]
async fn test_missing_table_fails_execution_without_dry_run() {
    let suite = Suite::builder("ghost", DataSource::table("no_such_table"))
        .check(Check::builder("rows").rule(builtin::row_count()).build())
        .build()
        .unwrap();

    let report = runner(SessionContext::new())
        .run_suite(&suite, &RunOptions::default().with_validate_first(false))
        .await
        .unwrap();

    assert_eq!(report.metadata.status, RunStatus::Failed);
    assert!(report.metadata.status.is_failure());
    assert!(report.results.is_empty());
}

#[tokio::test]
async fn test_run_exports_results() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("orders.json");

    let report = runner(orders_context())
        .with_exporter(JsonExporter::new(&json_path))
        .run_suite(&orders_suite(), &RunOptions::default().with_extra("pipeline", "nightly"))
        .await
        .unwrap();
    assert!(report.export_error.is_none());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(written["metadata"]["suite_name"], "orders");
    assert_eq!(written["metadata"]["status"], "SUCCESS");
    assert_eq!(written["metadata"]["extra.pipeline"], "nightly");
    assert_eq!(written["results"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_export_disabled_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let prom_path = dir.path().join("orders.prom");

    runner(orders_context())
        .with_boxed_exporter(ExportFormat::Prometheus.exporter(&prom_path))
        .run_suite(&orders_suite(), &RunOptions::default().with_export(false))
        .await
        .unwrap();

    assert!(!prom_path.exists());
}
