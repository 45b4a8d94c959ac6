//! Pipeline runs against a real ClickHouse server.
//!
//! Requires Docker to be running for the ClickHouse testcontainer, or
//! `PIPELINE_TEST_CLICKHOUSE_URL` pointing at a reachable server.
//! Run with `cargo test -p integration-tests --test clickhouse_e2e -- --ignored`.

use clickhouse_client::{query, schema, Warehouse};
use integration_tests::fixtures::{self, report_row, DataDir};
use integration_tests::setup::TestContext;
use pipeline_core::AnalysisOutcome;

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pipeline_e2e() {
    let ctx = TestContext::new().await;
    ctx.truncate_all().await.expect("Failed to truncate tables");

    let data = DataDir::new();
    let pipeline = ctx.pipeline(data.config());

    let summary = pipeline.run().await;
    assert!(summary.is_success(), "failed tasks: {:?}", summary.failed_tasks());

    let products = query::count_rows(&ctx.clickhouse, schema::PRODUCTS_TABLE)
        .await
        .expect("Count query failed");
    assert_eq!(products, 5);

    let sales = query::count_rows(&ctx.clickhouse, schema::SALES_TABLE)
        .await
        .expect("Count query failed");
    assert_eq!(sales, 7);

    let report = ctx.clickhouse.report_rows().await.expect("Query failed");
    assert_eq!(report.len(), fixtures::JOINED_SALES);
    let notebook = report.iter().find(|r| r.sale_id == "V001").unwrap();
    assert_eq!(notebook.margin.to_string(), "700.00");

    let alerts = ctx.clickhouse.low_performers().await.expect("Query failed");
    let names: Vec<String> = alerts.into_iter().map(|a| a.product_name).collect();
    assert_eq!(names, fixtures::LOW_PERFORMERS);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_rerun_does_not_duplicate_rows() {
    let ctx = TestContext::new().await;
    ctx.truncate_all().await.expect("Failed to truncate tables");

    let data = DataDir::new();
    let pipeline = ctx.pipeline(data.config());
    assert!(pipeline.run().await.is_success());
    assert!(pipeline.run().await.is_success());

    for (table, expected) in [
        (schema::PRODUCTS_TABLE, 5),
        (schema::SALES_TABLE, 7),
        (schema::REPORT_TABLE, fixtures::JOINED_SALES as u64),
        (schema::LOW_PERFORMANCE_TABLE, fixtures::LOW_PERFORMERS.len() as u64),
    ] {
        let count = query::count_rows(&ctx.clickhouse, table)
            .await
            .expect("Count query failed");
        assert_eq!(count, expected, "table {}", table);
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_aggregation_groups_by_name_and_category() {
    let ctx = TestContext::new().await;
    ctx.truncate_all().await.expect("Failed to truncate tables");

    ctx.clickhouse
        .replace_report(&[
            report_row("V1", "Cabo", "Acessorios", 1),
            report_row("V2", "Cabo", "Eletronicos", 1),
            report_row("V3", "Mesa", "Moveis", 1),
            report_row("V4", "Mesa", "Moveis", 1),
        ])
        .await
        .expect("Insert failed");

    let mut totals = ctx.clickhouse.product_sales_totals().await.expect("Query failed");
    totals.sort_by(|a, b| (&a.product_name, &a.category).cmp(&(&b.product_name, &b.category)));
    let flat: Vec<(&str, &str, i64)> = totals
        .iter()
        .map(|t| (t.product_name.as_str(), t.category.as_str(), t.total_units_sold))
        .collect();
    assert_eq!(
        flat,
        vec![
            ("Cabo", "Acessorios", 1),
            ("Cabo", "Eletronicos", 1),
            ("Mesa", "Moveis", 2),
        ]
    );

    let analyzer = worker::PerformanceAnalyzer::new(ctx.clickhouse.clone());
    let outcome = analyzer.analyze().await.expect("Analysis failed");
    assert_eq!(outcome, AnalysisOutcome::Alerted { count: 2 });

    ctx.clickhouse
        .replace_report(&[report_row("V5", "Mesa", "Moveis", 3)])
        .await
        .expect("Insert failed");
    let outcome = analyzer.analyze().await.expect("Analysis failed");
    assert_eq!(outcome, AnalysisOutcome::NoAlert);
    assert!(ctx.clickhouse.low_performers().await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_create_tables_is_idempotent() {
    let ctx = TestContext::new().await;
    ctx.truncate_all().await.expect("Failed to truncate tables");

    ctx.clickhouse
        .replace_report(&[report_row("V1", "Cabo", "Acessorios", 1)])
        .await
        .expect("Insert failed");

    ctx.clickhouse.create_tables().await.expect("First create failed");
    ctx.clickhouse.create_tables().await.expect("Second create failed");

    let count = query::count_rows(&ctx.clickhouse, schema::REPORT_TABLE)
        .await
        .expect("Count query failed");
    assert_eq!(count, 1, "existing rows must survive table creation");

    ctx.truncate_all().await.expect("Failed to truncate tables");
    for table in schema::table_names() {
        let count = query::count_rows(&ctx.clickhouse, table)
            .await
            .expect("Count query failed");
        assert_eq!(count, 0, "table {}", table);
    }
}
