//! End-to-end runs of the task graph against the in-memory warehouse.
//!
//! Source CSVs live in a temp directory; the warehouse is a `MockWarehouse`
//! implementing the same trait as the ClickHouse client.

use integration_tests::fixtures::{self, DataDir};
use integration_tests::mocks::MockOp;
use integration_tests::setup::mock_pipeline;
use pipeline_core::{AnalysisOutcome, DailySchedule};
use worker::{PipelineScheduler, RetryPolicy, TaskId, TaskState};

fn state(summary: &worker::RunSummary, id: TaskId) -> TaskState {
    summary.task(id).expect("task missing from summary").state.clone()
}

#[tokio::test]
async fn test_full_run_loads_reports_and_alerts() {
    let data = DataDir::new();
    let (pipeline, warehouse) = mock_pipeline(data.config());

    let summary = pipeline.run().await;
    assert!(summary.is_success(), "failed tasks: {:?}", summary.failed_tasks());
    assert_eq!(summary.tasks.len(), TaskId::ALL.len());

    assert!(warehouse.tables_created());
    assert_eq!(warehouse.products().len(), 5);
    assert_eq!(warehouse.sales().len(), 7);
    assert_eq!(warehouse.report().len(), fixtures::JOINED_SALES);

    let load = summary.load.expect("load stats");
    assert_eq!(load.products, 5);
    assert_eq!(load.sales, 7);
    assert_eq!(load.report_rows, fixtures::JOINED_SALES);

    assert_eq!(
        summary.analysis,
        Some(AnalysisOutcome::Alerted {
            count: fixtures::LOW_PERFORMERS.len()
        })
    );
    let flagged: Vec<String> = warehouse.alerts().into_iter().map(|a| a.product_name).collect();
    assert_eq!(flagged, fixtures::LOW_PERFORMERS);

    match state(&summary, TaskId::AnalyzePerformance) {
        TaskState::Success { detail } => {
            assert_eq!(detail, "Alert and load of 1 low-performance products completed.")
        }
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_report_file_written() {
    let data = DataDir::new();
    let (pipeline, _warehouse) = mock_pipeline(data.config());

    let summary = pipeline.run().await;
    let path = summary.report_path.expect("report path");
    assert!(path.starts_with(data.report_dir()));
    assert!(path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("sales_report_") && n.ends_with(".json")));

    let body: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(body["totals"]["sales"], fixtures::JOINED_SALES);
    assert_eq!(body["totals"]["units"], 10);
    assert_eq!(body["top_products"][0]["key"], "Notebook");
    assert_eq!(body["by_category"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_joined_rows_carry_product_attributes() {
    let data = DataDir::new();
    let (pipeline, warehouse) = mock_pipeline(data.config());

    pipeline.run().await;

    let report = warehouse.report();
    let notebook = report.iter().find(|r| r.sale_id == "V001").unwrap();
    assert_eq!(notebook.product_name, "Notebook");
    assert_eq!(notebook.category, "Eletronicos");
    assert_eq!(notebook.revenue.to_string(), "3200.00");
    assert_eq!(notebook.margin.to_string(), "700.00");
    assert_eq!(notebook.month, "2024-01");
    assert!(report.iter().all(|r| r.sale_id != "V007"));
}

#[tokio::test]
async fn test_rerun_replaces_instead_of_appending() {
    let data = DataDir::new();
    let (pipeline, warehouse) = mock_pipeline(data.config());

    assert!(pipeline.run().await.is_success());
    assert!(pipeline.run().await.is_success());

    assert_eq!(warehouse.products().len(), 5);
    assert_eq!(warehouse.sales().len(), 7);
    assert_eq!(warehouse.report().len(), fixtures::JOINED_SALES);
    assert_eq!(warehouse.alerts().len(), fixtures::LOW_PERFORMERS.len());
}

#[tokio::test]
async fn test_missing_sales_file_skips_downstream() {
    let data = DataDir::with_sources(Some(fixtures::PRODUCTS_CSV), None);
    let (pipeline, warehouse) = mock_pipeline(data.config());

    let summary = pipeline.run().await;
    assert!(!summary.is_success());
    assert_eq!(summary.failed_tasks(), vec![TaskId::ExtractSales]);

    assert!(state(&summary, TaskId::CreateTables).is_success());
    assert!(state(&summary, TaskId::ExtractProducts).is_success());
    for id in [
        TaskId::TransformData,
        TaskId::LoadData,
        TaskId::GenerateReport,
        TaskId::AnalyzePerformance,
    ] {
        assert_eq!(state(&summary, id), TaskState::UpstreamFailed, "{}", id);
        assert_eq!(summary.task(id).unwrap().attempts, 0);
    }

    assert!(warehouse.products().is_empty());
    assert_eq!(warehouse.calls(MockOp::ReplaceLowPerformers), 0);
    assert!(summary.report_path.is_none());
}

#[tokio::test]
async fn test_schema_failure_blocks_load_only_after_transform() {
    let data = DataDir::new();
    let (pipeline, warehouse) = mock_pipeline(data.config());
    warehouse.fail_always(MockOp::CreateTables);

    let summary = pipeline.run().await;
    assert_eq!(summary.failed_tasks(), vec![TaskId::CreateTables]);
    assert!(state(&summary, TaskId::TransformData).is_success());
    assert_eq!(state(&summary, TaskId::LoadData), TaskState::UpstreamFailed);

    match state(&summary, TaskId::CreateTables) {
        TaskState::Failed { error } => assert!(error.contains("DB_003")),
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let data = DataDir::new();
    let retry = RetryPolicy {
        retries: 2,
        delay_secs: 0,
    };
    let (pipeline, warehouse) = mock_pipeline(data.config_with_retry(retry));
    warehouse.fail_times(MockOp::ReplaceSales, 1);

    let summary = pipeline.run().await;
    assert!(summary.is_success());
    assert_eq!(summary.task(TaskId::LoadData).unwrap().attempts, 2);
    assert_eq!(summary.task(TaskId::CreateTables).unwrap().attempts, 1);
    assert_eq!(warehouse.sales().len(), 7);
}

#[tokio::test]
async fn test_retries_exhausted() {
    let data = DataDir::new();
    let retry = RetryPolicy {
        retries: 2,
        delay_secs: 0,
    };
    let (pipeline, warehouse) = mock_pipeline(data.config_with_retry(retry));
    warehouse.fail_always(MockOp::ReplaceProducts);

    let summary = pipeline.run().await;
    assert_eq!(summary.failed_tasks(), vec![TaskId::LoadData]);
    assert_eq!(summary.task(TaskId::LoadData).unwrap().attempts, 3);
    assert_eq!(warehouse.calls(MockOp::ReplaceProducts), 3);
    assert_eq!(state(&summary, TaskId::GenerateReport), TaskState::UpstreamFailed);
    assert_eq!(state(&summary, TaskId::AnalyzePerformance), TaskState::UpstreamFailed);
}

#[tokio::test]
async fn test_report_failure_does_not_block_analysis() {
    let data = DataDir::new();
    let (pipeline, warehouse) = mock_pipeline(data.config());
    warehouse.fail_always(MockOp::ReportRows);

    let summary = pipeline.run().await;
    assert_eq!(summary.failed_tasks(), vec![TaskId::GenerateReport]);
    assert!(state(&summary, TaskId::AnalyzePerformance).is_success());
    assert_eq!(warehouse.alerts().len(), fixtures::LOW_PERFORMERS.len());
}

#[tokio::test]
async fn test_bad_rows_are_skipped() {
    let products = format!("{}P006,Mesa,Moveis,abc,OfficeMax,Ativo\n", fixtures::PRODUCTS_CSV);
    let sales = format!(
        "{}V008,P001,-3,10.00,2024-03-05,Online\nV009,P001,9223372036854775807,2.00,2024-03-05,Online\n",
        fixtures::SALES_CSV
    );
    let data = DataDir::with_sources(Some(&products), Some(&sales));
    let (pipeline, warehouse) = mock_pipeline(data.config());

    let summary = pipeline.run().await;
    assert!(summary.is_success());
    assert_eq!(warehouse.products().len(), 5);
    assert_eq!(warehouse.sales().len(), 7);
    assert!(warehouse.sales().iter().all(|s| s.sale.sale_id != "V009"));

    match state(&summary, TaskId::ExtractProducts) {
        TaskState::Success { detail } => assert_eq!(detail, "5 records, 1 rejected"),
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_scheduler_run_once() {
    let data = DataDir::new();
    let (pipeline, warehouse) = mock_pipeline(data.config());
    let scheduler = PipelineScheduler::new(pipeline, DailySchedule::default());

    let summary = scheduler.run_once().await;
    assert!(summary.is_success());
    assert_eq!(warehouse.calls(MockOp::CreateTables), 1);
    assert_eq!(scheduler.schedule().hour(), 6);
}
