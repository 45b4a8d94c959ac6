//! Daily trigger for the pipeline.
//!
//! Sleeps until the next slot, runs the pipeline, and repeats. Slots missed
//! while the process was down are not replayed.

use std::sync::Arc;

use chrono::Utc;
use pipeline_core::DailySchedule;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::pipeline::{Pipeline, RunSummary};

/// Drives a pipeline on its daily schedule.
pub struct PipelineScheduler {
    pipeline: Arc<Pipeline>,
    schedule: DailySchedule,
    run_on_start: bool,
}

impl PipelineScheduler {
    pub fn new(pipeline: Arc<Pipeline>, schedule: DailySchedule) -> Self {
        Self {
            pipeline,
            schedule,
            run_on_start: false,
        }
    }

    /// Run once immediately before the first scheduled slot.
    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    pub fn schedule(&self) -> DailySchedule {
        self.schedule
    }

    /// Spawns the scheduling loop.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            hour = self.schedule.hour(),
            minute = self.schedule.minute(),
            "Pipeline scheduler started"
        );
        tokio::spawn(async move {
            self.run_forever().await;
        })
    }

    /// Runs the pipeline a single time and logs the result.
    pub async fn run_once(&self) -> RunSummary {
        if !self.pipeline.check_health().await {
            warn!("Starting run with unhealthy components");
        }

        let summary = self.pipeline.run().await;
        if !summary.is_success() {
            error!(
                run_id = %summary.run_id,
                failed = ?summary.failed_tasks(),
                "Scheduled run finished with failures"
            );
        }
        summary
    }

    async fn run_forever(&self) {
        if self.run_on_start {
            self.run_once().await;
        }

        loop {
            let now = Utc::now();
            let next = self.schedule.next_after(now);
            info!(next_run = %next, "Waiting for next scheduled run");
            tokio::time::sleep(self.schedule.until_next(now)).await;

            self.run_once().await;
        }
    }
}
