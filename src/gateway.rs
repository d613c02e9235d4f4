//! SQL Gateway
//!
//! The single entry point for free-text queries: classify, sanitize, then
//! execute on the read connection. Also hands out the introspector and the
//! ingestor bound to the same store.

use crate::config::GatewayConfig;
use crate::db::{SchemaInspector, Store};
use crate::error::Result;
use crate::execution::{ExecutionEngine, QueryExecution, QueryExecutor};
use crate::ingestion::{CsvIngestor, IngestResult};
use crate::security::{SqlValidator, ValidationOutcome};
use std::path::Path;
use std::sync::Arc;

pub struct SqlGateway {
    store: Arc<Store>,
    validator: SqlValidator,
    engine: ExecutionEngine,
    inspector: SchemaInspector,
}

impl SqlGateway {
    pub fn open(config: &GatewayConfig) -> Result<Self> {
        let store = Arc::new(Store::open_with_config(config)?);
        Self::new(store, config)
    }

    /// Bind a gateway to an already opened store. `config` supplies the row ceiling.
    pub fn new(store: Arc<Store>, config: &GatewayConfig) -> Result<Self> {
        config.validate()?;
        let validator = SqlValidator::new(config.max_rows)?;
        Ok(Self {
            engine: ExecutionEngine::new(Arc::clone(&store), validator.max_rows())?,
            inspector: SchemaInspector::new(Arc::clone(&store)),
            validator,
            store,
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn max_rows(&self) -> u64 {
        self.validator.max_rows()
    }

    pub fn schema(&self) -> &SchemaInspector {
        &self.inspector
    }

    pub fn ingestor(&self) -> CsvIngestor {
        CsvIngestor::new(Arc::clone(&self.store))
    }

    /// Classify and sanitize without executing.
    pub fn validate(&self, raw_query: &str) -> ValidationOutcome {
        self.validator.validate(raw_query)
    }

    /// Validate `raw_query` and run it. Rejections come back as `GatewayError::Rejected`.
    pub fn run_query(&self, raw_query: &str) -> Result<QueryExecution> {
        let sql = self.validator.check(raw_query)?;
        self.engine.execute(&sql)
    }

    pub fn load_csv(&self, source: impl AsRef<Path>, table_name: &str) -> Result<IngestResult> {
        self.ingestor().ingest(source, table_name)
    }
}

impl std::fmt::Debug for SqlGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlGateway")
            .field("store", &self.store)
            .field("max_rows", &self.max_rows())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn gateway(temp_dir: &TempDir, max_rows: u64) -> SqlGateway {
        let config = GatewayConfig::new(temp_dir.path().join("app.db")).with_max_rows(max_rows);
        SqlGateway::open(&config).unwrap()
    }

    #[test]
    fn test_run_query_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let gw = gateway(&temp_dir, 2);
        let csv = temp_dir.path().join("t.csv");
        fs::write(&csv, "k,v\na,1\nb,2\nc,3\n").unwrap();
        gw.load_csv(&csv, "t").unwrap();

        let result = gw.run_query("SELECT * FROM t LIMIT 999").unwrap();
        assert_eq!(result.sql_query, "SELECT * FROM t LIMIT 2");
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[0]["k"], json!("a"));
        assert!(!result.truncated);
    }

    #[test]
    fn test_rejected_query_never_runs() {
        let temp_dir = TempDir::new().unwrap();
        let gw = gateway(&temp_dir, 10);
        let csv = temp_dir.path().join("t.csv");
        fs::write(&csv, "k\na\n").unwrap();
        gw.load_csv(&csv, "t").unwrap();

        let err = gw.run_query("DROP TABLE t").unwrap_err();
        assert_eq!(err.rejection_reason(), Some("forbidden keyword: DROP"));
        assert!(gw.schema().table_exists("t").unwrap());
    }

    #[test]
    fn test_zero_ceiling_fails_at_construction() {
        let temp_dir = TempDir::new().unwrap();
        let config = GatewayConfig::new(temp_dir.path().join("app.db")).with_max_rows(0);
        assert!(matches!(SqlGateway::open(&config), Err(GatewayError::Config(_))));

        let store = Arc::new(Store::open(temp_dir.path().join("app.db")).unwrap());
        assert!(matches!(SqlGateway::new(store, &config), Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_validate_does_not_execute() {
        let temp_dir = TempDir::new().unwrap();
        let gw = gateway(&temp_dir, 10);
        let outcome = gw.validate("SELECT * FROM nowhere");
        assert_eq!(outcome.sql(), Some("SELECT * FROM nowhere LIMIT 10"));
    }
}
