//! Table Builder - Replaces a table with freshly inferred rows in one transaction

use crate::db::quote_identifier;
use crate::error::{GatewayError, Result};
use crate::ingestion::csv_connector::ParsedDataset;
use crate::ingestion::schema_inference::InferredSchema;
use rusqlite::{params_from_iter, Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Column-name fragments that earn a secondary index.
pub const INDEX_HINTS: &[&str] = &["id", "date", "category", "type", "status", "name"];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub rows_written: u64,
    pub indexes_created: Vec<String>,
    /// Index name with the reason it was skipped
    pub skipped_indexes: Vec<String>,
}

pub struct TableBuilder {
    index_hints: Vec<String>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self {
            index_hints: INDEX_HINTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns whose name contains one of the hint fragments.
    pub fn indexed_columns<'a>(&self, schema: &'a InferredSchema) -> Vec<&'a str> {
        schema
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| self.index_hints.iter().any(|hint| name.contains(hint.as_str())))
            .collect()
    }

    /// Drop, create, fill and index `schema.table_name`. Nothing is visible until commit.
    pub fn replace_table(
        &self,
        conn: &mut Connection,
        schema: &InferredSchema,
        dataset: &ParsedDataset,
    ) -> Result<BuildReport> {
        let table = quote_identifier(&schema.table_name);
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;

        let column_defs: Vec<String> = schema
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.column_type.sql_type()))
            .collect();
        let create_sql = format!("CREATE TABLE {} ({})", table, column_defs.join(", "));
        debug!("{}", create_sql);
        tx.execute(&create_sql, [])?;

        let mut report = BuildReport::default();
        {
            let column_list: Vec<String> = schema.columns.iter().map(|c| quote_identifier(&c.name)).collect();
            let placeholders: Vec<String> = (1..=schema.columns.len()).map(|i| format!("?{}", i)).collect();
            let insert_sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                column_list.join(", "),
                placeholders.join(", ")
            );
            let mut stmt = tx.prepare(&insert_sql)?;
            for record in &dataset.records {
                let values = schema
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(idx, column)| column.column_type.to_sql_value(record.get(idx).and_then(|c| c.as_deref())));
                stmt.execute(params_from_iter(values))?;
                report.rows_written += 1;
            }
        }

        // The drop above removed this table's own indexes, so any object still
        // holding an index name belongs to another table and the create fails.
        for column in self.indexed_columns(schema) {
            let index_name = format!("idx_{}_{}", schema.table_name, column);
            let index_sql = format!(
                "CREATE INDEX {} ON {} ({})",
                quote_identifier(&index_name),
                table,
                quote_identifier(column)
            );
            match tx.execute(&index_sql, []) {
                Ok(_) => {
                    debug!("Created index {}", index_name);
                    report.indexes_created.push(index_name);
                }
                Err(e) => {
                    let failure = GatewayError::IndexCreationFailed(format!("{}: {}", index_name, e));
                    warn!("{}", failure);
                    report.skipped_indexes.push(format!("{} ({})", index_name, e));
                }
            }
        }

        tx.commit()?;
        info!(
            "Replaced table {} with {} rows, {} indexes",
            schema.table_name,
            report.rows_written,
            report.indexes_created.len()
        );
        Ok(report)
    }
}
