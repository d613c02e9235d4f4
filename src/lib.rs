//! Read-only SQL gateway over a SQLite store loaded from CSV files.

pub mod config;
pub mod db;
pub mod error;
pub mod execution;
pub mod gateway;
pub mod ingestion;
pub mod security;
pub mod tools;

pub use config::GatewayConfig;
pub use db::{ColumnInfo, DatabaseSummary, SchemaInspector, Store, TableSchema};
pub use error::{GatewayError, Result};
pub use execution::{ExecutionEngine, QueryExecution, QueryExecutor, Row};
pub use gateway::SqlGateway;
pub use ingestion::{CsvIngestor, IngestResult};
pub use security::{classify, sanitize, SqlValidator, ValidationOutcome};
pub use tools::{GatewayTools, ToolCall, ToolDefinition, ToolOutput};
