//! Pipeline settings: input files, report output, schedule, and retries.

use std::path::PathBuf;

use pipeline_core::{DailySchedule, Result, DEFAULT_SCHEDULE, DEFAULT_TOP_PRODUCTS};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Runtime settings for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the source CSVs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Products CSV file name inside `data_dir`
    #[serde(default = "default_products_file")]
    pub products_file: String,
    /// Sales CSV file name inside `data_dir`
    #[serde(default = "default_sales_file")]
    pub sales_file: String,
    /// Where JSON reports are written
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    /// Daily cron expression (UTC)
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Run once immediately before waiting for the first slot
    #[serde(default)]
    pub run_on_start: bool,
    /// Run once and exit instead of scheduling
    #[serde(default)]
    pub run_once: bool,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Products listed in the report ranking
    #[serde(default = "default_top_products")]
    pub top_products: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_products_file() -> String {
    "produtos_loja.csv".to_string()
}

fn default_sales_file() -> String {
    "vendas_produtos.csv".to_string()
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_schedule() -> String {
    DEFAULT_SCHEDULE.to_string()
}

fn default_top_products() -> usize {
    DEFAULT_TOP_PRODUCTS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            products_file: default_products_file(),
            sales_file: default_sales_file(),
            report_dir: default_report_dir(),
            schedule: default_schedule(),
            run_on_start: false,
            run_once: false,
            retry: RetryPolicy::default(),
            top_products: default_top_products(),
        }
    }
}

impl PipelineConfig {
    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join(&self.products_file)
    }

    pub fn sales_path(&self) -> PathBuf {
        self.data_dir.join(&self.sales_file)
    }

    /// Parses the configured cron expression.
    pub fn daily_schedule(&self) -> Result<DailySchedule> {
        self.schedule.parse()
    }
}
