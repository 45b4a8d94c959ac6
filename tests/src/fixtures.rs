//! Test fixtures: source CSVs, report rows, and temporary data directories.

use std::path::{Path, PathBuf};

use pipeline_core::{Cents, ReportRow};
use tempfile::TempDir;
use worker::{PipelineConfig, RetryPolicy};

/// Catalog of five products. P005 has no sales.
pub const PRODUCTS_CSV: &str = "\
ID_Produto,Nome_Produto,Categoria,Preco_Custo,Fornecedor,Status
P001,Notebook,Eletronicos,2500.00,TechCorp,Ativo
P002,Mouse,Perifericos,25.50,TechCorp,Ativo
P003,Cadeira,Moveis,450.00,OfficeMax,Ativo
P004,Monitor,Eletronicos,800.00,TechCorp,Ativo
P005,Cabo HDMI,Acessorios,10.00,CaboBR,Inativo
";

/// Seven sales. Cadeira sells a single unit, Monitor and Notebook exactly
/// two, Mouse five. V007 references a product that is not in the catalog.
pub const SALES_CSV: &str = "\
ID_Venda,ID_Produto,Quantidade_Vendida,Preco_Venda,Data_Venda,Canal_Venda
V001,P001,1,3200.00,2024-01-15,Online
V002,P002,3,45.00,2024-01-16,Loja Fisica
V003,P002,2,45.00,2024-02-03,Online
V004,P003,1,650.00,2024-02-10,Online
V005,P004,2,1100.00,2024-02-11,Loja Fisica
V006,P001,1,3100.00,2024-03-01,Loja Fisica
V007,P009,4,15.00,2024-03-02,Online
";

/// Number of sales in `SALES_CSV` joined to a known product.
pub const JOINED_SALES: usize = 6;

/// Products in `SALES_CSV` that sell fewer than two units.
pub const LOW_PERFORMERS: &[&str] = &["Cadeira"];

/// A joined report row with the given units.
pub fn report_row(sale_id: &str, product: &str, category: &str, quantity: i64) -> ReportRow {
    ReportRow {
        sale_id: sale_id.into(),
        product_name: product.into(),
        category: category.into(),
        quantity,
        revenue: Cents(10_000 * quantity),
        margin: Cents(2_500 * quantity),
        channel: "Online".into(),
        month: "2024-01".into(),
    }
}

/// Temporary directory holding the source CSVs and the report output.
pub struct DataDir {
    dir: TempDir,
}

impl DataDir {
    /// Data directory with both default fixtures.
    pub fn new() -> Self {
        Self::with_sources(Some(PRODUCTS_CSV), Some(SALES_CSV))
    }

    /// Data directory with the given sources; `None` leaves the file out.
    pub fn with_sources(products: Option<&str>, sales: Option<&str>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = PipelineConfig::default();

        if let Some(products) = products {
            std::fs::write(dir.path().join(&config.products_file), products)
                .expect("Failed to write products CSV");
        }
        if let Some(sales) = sales {
            std::fs::write(dir.path().join(&config.sales_file), sales)
                .expect("Failed to write sales CSV");
        }

        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn report_dir(&self) -> PathBuf {
        self.dir.path().join("reports")
    }

    /// Pipeline settings pointing at this directory, without retries.
    pub fn config(&self) -> PipelineConfig {
        self.config_with_retry(RetryPolicy::none())
    }

    pub fn config_with_retry(&self, retry: RetryPolicy) -> PipelineConfig {
        PipelineConfig {
            data_dir: self.dir.path().to_path_buf(),
            report_dir: self.report_dir(),
            retry,
            ..Default::default()
        }
    }
}

impl Default for DataDir {
    fn default() -> Self {
        Self::new()
    }
}
