//! Execution of sanitized queries against the store.

pub mod engine;
pub mod result;

pub use engine::{ExecutionEngine, QueryExecutor};
pub use result::{QueryExecution, Row};
