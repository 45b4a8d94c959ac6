//! The daily sales pipeline and its fixed task graph.
//!
//! ```text
//! create_tables ───────────────────────────┐
//! extract_products ─┐                      ├─> load_data ─┬─> generate_report
//! extract_sales ────┴─> transform_data ────┘              └─> analyze_performance
//! ```
//!
//! Tasks without a path between them run concurrently. Every task runs
//! under the configured retry policy; a task whose upstream failed is not
//! attempted and is reported as `UpstreamFailed`.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use clickhouse_client::Warehouse;
use pipeline_core::{AnalysisOutcome, Error, Result};
use serde::Serialize;
use telemetry::{health, log_snapshot, metrics};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::extract::{self, Extracted};
use crate::load::{load, LoadStats};
use crate::performance::PerformanceAnalyzer;
use crate::report::{generate_report, GeneratedReport};
use crate::retry::run_with_retry;
use crate::transform::{transform, TransformedData};

/// Identifier of the pipeline's fixed DAG.
pub const PIPELINE_NAME: &str = "daily_sales_pipeline";

/// The tasks of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskId {
    CreateTables,
    ExtractProducts,
    ExtractSales,
    TransformData,
    LoadData,
    GenerateReport,
    AnalyzePerformance,
}

impl TaskId {
    /// All tasks in a valid execution order.
    pub const ALL: [TaskId; 7] = [
        TaskId::CreateTables,
        TaskId::ExtractProducts,
        TaskId::ExtractSales,
        TaskId::TransformData,
        TaskId::LoadData,
        TaskId::GenerateReport,
        TaskId::AnalyzePerformance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TaskId::CreateTables => "create_tables",
            TaskId::ExtractProducts => "extract_products",
            TaskId::ExtractSales => "extract_sales",
            TaskId::TransformData => "transform_data",
            TaskId::LoadData => "load_data",
            TaskId::GenerateReport => "generate_report",
            TaskId::AnalyzePerformance => "analyze_performance",
        }
    }

    /// Tasks that must succeed before this one may start.
    pub fn upstream(&self) -> &'static [TaskId] {
        match self {
            TaskId::CreateTables | TaskId::ExtractProducts | TaskId::ExtractSales => &[],
            TaskId::TransformData => &[TaskId::ExtractProducts, TaskId::ExtractSales],
            TaskId::LoadData => &[TaskId::CreateTables, TaskId::TransformData],
            TaskId::GenerateReport | TaskId::AnalyzePerformance => &[TaskId::LoadData],
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Final state of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskState {
    Success { detail: String },
    Failed { error: String },
    UpstreamFailed,
}

impl TaskState {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Success { .. })
    }
}

/// How one task ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub task: TaskId,
    #[serde(flatten)]
    pub state: TaskState,
    /// Attempts made (0 when never started)
    pub attempts: u32,
    pub duration_ms: u64,
}

impl TaskOutcome {
    fn upstream_failed(task: TaskId) -> Self {
        Self {
            task,
            state: TaskState::UpstreamFailed,
            attempts: 0,
            duration_ms: 0,
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tasks: Vec<TaskOutcome>,
    pub load: Option<LoadStats>,
    pub report_path: Option<PathBuf>,
    pub analysis: Option<AnalysisOutcome>,
}

impl RunSummary {
    /// Whether every task succeeded.
    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(|t| t.state.is_success())
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskOutcome> {
        self.tasks.iter().find(|t| t.task == id)
    }

    pub fn failed_tasks(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.state, TaskState::Failed { .. }))
            .map(|t| t.task)
            .collect()
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// One-line description of a task's successful result.
trait TaskOutput {
    fn detail(&self) -> String;
}

impl TaskOutput for () {
    fn detail(&self) -> String {
        "ok".to_string()
    }
}

impl<T> TaskOutput for Extracted<T> {
    fn detail(&self) -> String {
        format!("{} records, {} rejected", self.records.len(), self.rejected)
    }
}

impl TaskOutput for TransformedData {
    fn detail(&self) -> String {
        format!(
            "{} products, {} sales, {} report rows",
            self.products.len(),
            self.sales.len(),
            self.report.len()
        )
    }
}

impl TaskOutput for LoadStats {
    fn detail(&self) -> String {
        format!(
            "{} products, {} sales, {} report rows loaded",
            self.products, self.sales, self.report_rows
        )
    }
}

impl TaskOutput for GeneratedReport {
    fn detail(&self) -> String {
        format!("{} sales summarized to {}", self.report.totals.sales, self.path.display())
    }
}

impl TaskOutput for AnalysisOutcome {
    fn detail(&self) -> String {
        self.message()
    }
}

/// Runs the daily sales pipeline against a warehouse.
pub struct Pipeline {
    warehouse: Arc<dyn Warehouse>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(warehouse: Arc<dyn Warehouse>, config: PipelineConfig) -> Self {
        Self { warehouse, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn warehouse(&self) -> &Arc<dyn Warehouse> {
        &self.warehouse
    }

    /// Runs the whole task graph once.
    ///
    /// Task failures are captured in the summary rather than returned.
    pub async fn run(&self) -> RunSummary {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", pipeline = PIPELINE_NAME, run_id = %run_id);
        self.run_graph(run_id).instrument(span).await
    }

    async fn run_graph(&self, run_id: Uuid) -> RunSummary {
        let started_at = Utc::now();
        let timer = Instant::now();
        metrics().runs_started.inc();
        info!("Pipeline run started");

        let warehouse: &dyn Warehouse = &*self.warehouse;
        let products_path = self.config.products_path();
        let sales_path = self.config.sales_path();
        let (products_path, sales_path) = (products_path.as_path(), sales_path.as_path());

        let mut tasks = Vec::with_capacity(TaskId::ALL.len());

        let (create, products, sales) = tokio::join!(
            self.execute(TaskId::CreateTables, move || warehouse.create_tables()),
            self.execute(TaskId::ExtractProducts, move || {
                extract_blocking(products_path, extract::read_products)
            }),
            self.execute(TaskId::ExtractSales, move || {
                extract_blocking(sales_path, extract::read_sales)
            }),
        );
        let (create_outcome, created) = create;
        let (products_outcome, products) = products;
        let (sales_outcome, sales) = sales;
        tasks.extend([create_outcome, products_outcome, sales_outcome]);

        let transformed = match (&products, &sales) {
            (Some(products), Some(sales)) => {
                let (p, s) = (&products.records, &sales.records);
                let (outcome, data) = self
                    .execute(TaskId::TransformData, move || async move {
                        Ok::<_, Error>(transform(p, s))
                    })
                    .await;
                tasks.push(outcome);
                data
            }
            _ => {
                tasks.push(TaskOutcome::upstream_failed(TaskId::TransformData));
                None
            }
        };

        let loaded = match (&created, &transformed) {
            (Some(()), Some(data)) => {
                let (outcome, stats) = self
                    .execute(TaskId::LoadData, move || load(warehouse, data))
                    .await;
                tasks.push(outcome);
                stats
            }
            _ => {
                tasks.push(TaskOutcome::upstream_failed(TaskId::LoadData));
                None
            }
        };

        let mut report_path = None;
        let mut analysis = None;
        if loaded.is_some() {
            let analyzer = PerformanceAnalyzer::new(self.warehouse.clone());
            let analyzer = &analyzer;
            let report_dir = self.config.report_dir.as_path();
            let top_products = self.config.top_products;

            let (report, analyzed) = tokio::join!(
                self.execute(TaskId::GenerateReport, move || {
                    generate_report(warehouse, report_dir, top_products, Utc::now())
                }),
                self.execute(TaskId::AnalyzePerformance, move || analyzer.analyze()),
            );
            let (report_outcome, report) = report;
            let (analysis_outcome, analyzed) = analyzed;
            tasks.extend([report_outcome, analysis_outcome]);
            report_path = report.map(|r| r.path);
            analysis = analyzed;
        } else {
            tasks.push(TaskOutcome::upstream_failed(TaskId::GenerateReport));
            tasks.push(TaskOutcome::upstream_failed(TaskId::AnalyzePerformance));
        }

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            tasks,
            load: loaded,
            report_path,
            analysis,
        };

        metrics()
            .run_duration_ms
            .observe(timer.elapsed().as_millis() as u64);
        if summary.is_success() {
            metrics().runs_succeeded.inc();
            info!(duration_ms = summary.duration_ms(), "Pipeline run succeeded");
        } else {
            metrics().runs_failed.inc();
            let failed: Vec<&str> = summary.failed_tasks().iter().map(|t| t.name()).collect();
            error!(
                duration_ms = summary.duration_ms(),
                failed = ?failed,
                "Pipeline run failed"
            );
        }
        log_snapshot(&metrics().snapshot());

        summary
    }

    /// Runs one task under the retry policy and records its outcome.
    async fn execute<T, F, Fut>(&self, task: TaskId, op: F) -> (TaskOutcome, Option<T>)
    where
        T: TaskOutput,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timer = Instant::now();
        let (result, attempts) = run_with_retry(task.name(), &self.config.retry, op).await;
        let duration_ms = timer.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                let detail = value.detail();
                info!(task = %task, attempts = attempts, duration_ms = duration_ms, detail = %detail, "Task succeeded");
                let outcome = TaskOutcome {
                    task,
                    state: TaskState::Success { detail },
                    attempts,
                    duration_ms,
                };
                (outcome, Some(value))
            }
            Err(e) => {
                metrics().task_failures.inc();
                error!(
                    task = %task,
                    attempts = attempts,
                    error = %e,
                    code = e.error_code().unwrap_or("-"),
                    "Task failed"
                );
                let outcome = TaskOutcome {
                    task,
                    state: TaskState::Failed {
                        error: e.to_string(),
                    },
                    attempts,
                    duration_ms,
                };
                (outcome, None)
            }
        }
    }

    /// Checks the source files and the warehouse, updating the health registry.
    pub async fn check_health(&self) -> bool {
        let mut missing = Vec::new();
        for path in [self.config.products_path(), self.config.sales_path()] {
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                missing.push(path.display().to_string());
            }
        }
        if missing.is_empty() {
            health().sources.set_healthy();
        } else {
            warn!(missing = ?missing, "Source files not found");
            health()
                .sources
                .set_unhealthy(format!("missing: {}", missing.join(", ")));
        }

        if self.warehouse.is_healthy().await {
            health().clickhouse.set_healthy();
        } else {
            warn!("Warehouse health check failed");
            health().clickhouse.set_unhealthy("warehouse unreachable");
        }

        health().is_ready()
    }
}

/// Runs a CSV reader on the blocking pool.
async fn extract_blocking<T>(
    path: &Path,
    read: fn(&Path) -> Result<Extracted<T>>,
) -> Result<Extracted<T>>
where
    T: Send + 'static,
{
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || read(&path))
        .await
        .map_err(|e| Error::internal(format!("extraction task aborted: {}", e)))?
}
