//! Schema Introspector
//!
//! Read-only view of what the store holds: tables, their columns, row counts
//! and a handful of sample rows.

use crate::db::connection::{quote_identifier, Store};
use crate::error::{GatewayError, Result};
use crate::execution::result::{materialize_rows, Row};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const SAMPLE_ROW_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Engine-native declared type
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
    pub row_count: u64,
    pub sample_rows: Vec<Row>,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub db_path: String,
    pub tables: Vec<String>,
    pub total_tables: usize,
}

#[derive(Debug, Clone)]
pub struct SchemaInspector {
    store: Arc<Store>,
}

impl SchemaInspector {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        self.store
            .with_reader(|conn| Ok(canonical_table_name(conn, table_name)?.is_some()))
    }

    /// User tables ordered by name; SQLite's internal tables are left out.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        self.store.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND lower(substr(name, 1, 7)) <> 'sqlite_' \
                 ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names)
        })
    }

    pub fn describe_table(&self, table_name: &str) -> Result<TableSchema> {
        self.store.with_reader(|conn| {
            let name = canonical_table_name(conn, table_name)?
                .ok_or_else(|| GatewayError::NotFound(format!("Table '{}' does not exist", table_name)))?;
            debug!("Describing table {}", name);

            let mut stmt = conn.prepare(
                "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
            )?;
            let columns = stmt
                .query_map(params![name], |row| {
                    Ok(ColumnInfo {
                        name: row.get(0)?,
                        data_type: row.get(1)?,
                        nullable: row.get::<_, i64>(2)? == 0,
                        primary_key: row.get::<_, i64>(3)? > 0,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let quoted = quote_identifier(&name);
            let row_count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", quoted), [], |row| row.get(0))?;

            let mut sample_stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT {}", quoted, SAMPLE_ROW_LIMIT))?;
            let sample = materialize_rows(&mut sample_stmt, SAMPLE_ROW_LIMIT)?;

            Ok(TableSchema {
                table_name: name,
                columns,
                row_count: row_count.max(0) as u64,
                sample_rows: sample.rows,
            })
        })
    }

    pub fn database_summary(&self) -> Result<DatabaseSummary> {
        let tables = self.list_tables()?;
        Ok(DatabaseSummary {
            db_path: self.store.path().display().to_string(),
            total_tables: tables.len(),
            tables,
        })
    }
}

/// Stored spelling of `table_name`; SQLite identifiers match case-insensitively.
fn canonical_table_name(conn: &Connection, table_name: &str) -> Result<Option<String>> {
    let name = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            params![table_name.trim()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(name)
}
