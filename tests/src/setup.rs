//! Common test setup functions.

use std::sync::Arc;

use clickhouse_client::{insert::truncate_table, schema, ClickHouseClient, ClickHouseConfig};
use pipeline_core::Result;
use worker::{Pipeline, PipelineConfig};

use crate::containers::TestContainers;
use crate::mocks::MockWarehouse;

/// Pipeline wired to an in-memory warehouse.
pub fn mock_pipeline(config: PipelineConfig) -> (Arc<Pipeline>, MockWarehouse) {
    let warehouse = MockWarehouse::new();
    let pipeline = Arc::new(Pipeline::new(Arc::new(warehouse.clone()), config));
    (pipeline, warehouse)
}

/// Test context with a real ClickHouse server.
pub struct TestContext {
    pub containers: TestContainers,
    pub clickhouse: Arc<ClickHouseClient>,
}

impl TestContext {
    /// Start ClickHouse and create the pipeline schema.
    pub async fn new() -> Self {
        let containers = TestContainers::start().await;

        let ch_config = ClickHouseConfig {
            url: containers.clickhouse_url.clone(),
            database: containers.clickhouse_database.clone(),
            username: containers.clickhouse_username.clone(),
            password: containers.clickhouse_password.clone(),
            timeout_secs: 30,
        };
        let clickhouse =
            Arc::new(ClickHouseClient::new(ch_config).expect("Failed to create ClickHouse client"));

        schema::init_schema(&clickhouse)
            .await
            .expect("Failed to initialize schema");

        Self {
            containers,
            clickhouse,
        }
    }

    /// Pipeline that writes to this context's ClickHouse.
    pub fn pipeline(&self, config: PipelineConfig) -> Pipeline {
        Pipeline::new(self.clickhouse.clone(), config)
    }

    /// Empty every pipeline table.
    pub async fn truncate_all(&self) -> Result<()> {
        for table in schema::table_names() {
            truncate_table(&self.clickhouse, table).await?;
        }
        Ok(())
    }

    pub fn clickhouse_url(&self) -> &str {
        &self.containers.clickhouse_url
    }
}
