//! Execution Engine
//!
//! Runs already-sanitized SQL on the store's query-only connection and
//! materializes bounded results. It does not re-validate: every free-text
//! query must come through `SqlGateway` (or `SqlValidator`) first.

use crate::db::Store;
use crate::error::{GatewayError, Result};
use crate::execution::result::{materialize_rows, round2, QueryExecution};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Anything that can run sanitized SQL and hand back a `QueryExecution`.
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, sanitized_query: &str) -> Result<QueryExecution>;
}

pub struct ExecutionEngine {
    store: Arc<Store>,
    max_rows: usize,
}

impl ExecutionEngine {
    /// Fails with `GatewayError::Config` when `max_rows` is zero.
    pub fn new(store: Arc<Store>, max_rows: u64) -> Result<Self> {
        if max_rows == 0 {
            return Err(GatewayError::Config("max_rows must be at least 1".to_string()));
        }
        Ok(Self {
            store,
            max_rows: usize::try_from(max_rows).unwrap_or(usize::MAX),
        })
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }
}

impl QueryExecutor for ExecutionEngine {
    fn execute(&self, sanitized_query: &str) -> Result<QueryExecution> {
        info!("Executing query: {}", sanitized_query);
        let start = Instant::now();

        let materialized = self
            .store
            .with_reader(|conn| {
                let mut statement = conn
                    .prepare(sanitized_query)
                    .map_err(|e| GatewayError::QueryFailed(e.to_string()))?;
                materialize_rows(&mut statement, self.max_rows)
            })
            .map_err(|e| {
                error!("SQL execution error: {}", e);
                match e {
                    GatewayError::QueryFailed(_) => e,
                    other => GatewayError::QueryFailed(other.to_string()),
                }
            })?;

        let execution_time_ms = round2(start.elapsed().as_secs_f64() * 1000.0);
        if materialized.truncated {
            warn!(
                "Result truncated at {} rows by the engine row cap: {}",
                self.max_rows, sanitized_query
            );
        }
        debug!("Query returned {} rows in {}ms", materialized.rows.len(), execution_time_ms);

        Ok(QueryExecution {
            sql_query: sanitized_query.to_string(),
            columns: materialized.columns,
            row_count: materialized.rows.len(),
            rows: materialized.rows,
            execution_time_ms,
            truncated: materialized.truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_with_numbers(temp_dir: &TempDir, count: i64) -> Arc<Store> {
        let store = Arc::new(Store::open(temp_dir.path().join("app.db")).unwrap());
        store
            .with_writer(|conn| {
                conn.execute_batch("CREATE TABLE nums (n INTEGER, label TEXT)")?;
                for n in 0..count {
                    conn.execute("INSERT INTO nums VALUES (?1, ?2)", rusqlite::params![n, format!("n{}", n)])?;
                }
                Ok(())
            })
            .unwrap();
        store
    }

    #[test]
    fn test_rows_follow_result_set_column_order() {
        let temp_dir = TempDir::new().unwrap();
        let engine = ExecutionEngine::new(store_with_numbers(&temp_dir, 3), 100).unwrap();

        let result = engine.execute("SELECT label, n FROM nums ORDER BY n LIMIT 100").unwrap();
        assert_eq!(result.columns, vec!["label", "n"]);
        assert_eq!(result.row_count, 3);
        let keys: Vec<&String> = result.rows[0].keys().collect();
        assert_eq!(keys, vec!["label", "n"]);
        assert_eq!(result.rows[2]["n"], json!(2));
        assert!(!result.truncated);
        assert!(result.execution_time_ms >= 0.0);
    }

    #[test]
    fn test_engine_row_cap() {
        let temp_dir = TempDir::new().unwrap();
        let engine = ExecutionEngine::new(store_with_numbers(&temp_dir, 20), 5).unwrap();

        let result = engine.execute("SELECT * FROM (SELECT * FROM nums LIMIT 15)").unwrap();
        assert_eq!(result.row_count, 5);
        assert!(result.truncated);
    }

    #[test]
    fn test_engine_errors_are_query_failed() {
        let temp_dir = TempDir::new().unwrap();
        let engine = ExecutionEngine::new(store_with_numbers(&temp_dir, 1), 10).unwrap();

        assert!(matches!(
            engine.execute("SELECT * FROM missing_table LIMIT 10"),
            Err(GatewayError::QueryFailed(_))
        ));
        assert!(matches!(
            engine.execute("SELECT nope FROM nums LIMIT 10"),
            Err(GatewayError::QueryFailed(_))
        ));
    }

    #[test]
    fn test_zero_row_cap_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            ExecutionEngine::new(store_with_numbers(&temp_dir, 1), 0),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn test_direct_writes_fail_on_query_only_connection() {
        let temp_dir = TempDir::new().unwrap();
        let engine = ExecutionEngine::new(store_with_numbers(&temp_dir, 1), 10).unwrap();
        assert!(matches!(engine.execute("DELETE FROM nums"), Err(GatewayError::QueryFailed(_))));
    }
}
