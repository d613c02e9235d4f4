//! Ingestion Module
//!
//! Loads a CSV file into the store as a freshly replaced table:
//! - Header and cell normalization
//! - Column type inference
//! - Transactional table replacement
//! - Heuristic secondary indexes

pub mod csv_connector;
pub mod schema_inference;
pub mod table_builder;

pub use csv_connector::{CsvConnector, ParsedDataset};
pub use schema_inference::{normalize_identifier, ColumnType, InferredColumn, InferredSchema, SchemaInference};
pub use table_builder::{BuildReport, TableBuilder, INDEX_HINTS};

use crate::db::Store;
use crate::error::{GatewayError, Result};
use crate::execution::result::round2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Ingestion result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestResult {
    /// Normalized table name
    pub table_name: String,

    pub rows_loaded: u64,

    /// Normalized column names, in file order
    pub columns: Vec<String>,

    /// Wall-clock load time in seconds, rounded to two decimals
    pub load_time_seconds: f64,

    pub db_path: String,

    pub indexes_created: Vec<String>,

    /// Indexes that could not be built, with the reason
    pub skipped_indexes: Vec<String>,

    pub loaded_at: DateTime<Utc>,
}

pub struct CsvIngestor {
    store: Arc<Store>,
    connector: CsvConnector,
    inference: SchemaInference,
    builder: TableBuilder,
}

impl CsvIngestor {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            connector: CsvConnector::new(),
            inference: SchemaInference::new(),
            builder: TableBuilder::new(),
        }
    }

    /// Replace table `table_name` with the contents of the CSV at `source`.
    pub fn ingest(&self, source: impl AsRef<Path>, table_name: &str) -> Result<IngestResult> {
        let source = source.as_ref();
        let table = normalize_identifier(table_name);
        if table.is_empty() {
            return Err(GatewayError::InvalidInput("table name must not be empty".to_string()));
        }
        if table.starts_with("sqlite_") {
            return Err(GatewayError::InvalidInput(format!(
                "table name '{}' is reserved for SQLite internals",
                table
            )));
        }

        let start = Instant::now();
        let dataset = self.connector.read_path(source)?;
        if dataset.is_empty() {
            return Err(GatewayError::EmptySource(format!(
                "{} has no header or no data rows",
                source.display()
            )));
        }

        let schema = self.inference.infer_schema(&table, &dataset);
        let report = self
            .store
            .with_writer(|conn| self.builder.replace_table(conn, &schema, &dataset))?;

        let result = IngestResult {
            table_name: table,
            rows_loaded: report.rows_written,
            columns: schema.column_names(),
            load_time_seconds: round2(start.elapsed().as_secs_f64()),
            db_path: self.store.path().display().to_string(),
            indexes_created: report.indexes_created,
            skipped_indexes: report.skipped_indexes,
            loaded_at: Utc::now(),
        };
        info!(
            "Loaded {} rows from {} into {} in {}s",
            result.rows_loaded,
            source.display(),
            result.table_name,
            result.load_time_seconds
        );
        Ok(result)
    }
}
