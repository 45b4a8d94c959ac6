//! Readiness checks for source files and the warehouse.

use integration_tests::fixtures::{self, DataDir};
use integration_tests::setup::mock_pipeline;
use telemetry::health;

// Health is a process-wide registry, so the scenarios run in sequence.
#[tokio::test]
async fn test_health_transitions() {
    let data = DataDir::new();
    let (pipeline, warehouse) = mock_pipeline(data.config());

    assert!(pipeline.check_health().await);
    assert!(health().report().ready);

    warehouse.set_unhealthy(true);
    assert!(!pipeline.check_health().await);
    let report = health().report();
    assert!(!report.ready);
    let failing: Vec<&str> = report.failing().map(|c| c.name).collect();
    assert_eq!(failing, vec!["clickhouse"]);

    warehouse.set_unhealthy(false);
    let missing = DataDir::with_sources(Some(fixtures::PRODUCTS_CSV), None);
    let (pipeline, _) = mock_pipeline(missing.config());
    assert!(!pipeline.check_health().await);
    let sources = health()
        .report()
        .components
        .into_iter()
        .find(|c| c.name == "sources")
        .unwrap();
    assert!(!sources.healthy);
    assert!(sources
        .message
        .is_some_and(|m| m.contains("vendas_produtos.csv")));
}
