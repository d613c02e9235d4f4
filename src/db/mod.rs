//! Store access: the connection handle and read-only schema introspection.

pub mod connection;
pub mod schema;

pub use connection::{quote_identifier, Store};
pub use schema::{ColumnInfo, DatabaseSummary, SchemaInspector, TableSchema};
