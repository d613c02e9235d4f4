//! Query Result - structured, bounded rows returned by the gateway

use crate::error::{GatewayError, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::Statement;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row: field name → value, in result-set column order.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExecution {
    /// The sanitized query that actually ran
    pub sql_query: String,

    /// Result-set column names, in order
    pub columns: Vec<String>,

    pub rows: Vec<Row>,

    pub row_count: usize,

    /// Wall-clock execution time, rounded to two decimals
    pub execution_time_ms: f64,

    /// True when the engine's row cap cut the result short
    pub truncated: bool,
}

impl QueryExecution {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rows read from a prepared statement, up to a cap.
pub(crate) struct MaterializedRows {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub truncated: bool,
}

/// Step `statement` and collect at most `max_rows` rows.
///
/// SQLite re-prepares a statement on its first step when the schema changed
/// since `prepare`, so column names are read from the stepped statement.
pub(crate) fn materialize_rows(statement: &mut Statement<'_>, max_rows: usize) -> Result<MaterializedRows> {
    let mut columns = column_names(statement);
    let mut out = Vec::new();
    let mut truncated = false;
    {
        let mut rows = statement
            .query([])
            .map_err(|e| GatewayError::QueryFailed(e.to_string()))?;

        while let Some(row) = rows.next().map_err(|e| GatewayError::QueryFailed(e.to_string()))? {
            if out.is_empty() {
                columns = column_names(row.as_ref());
            }
            if out.len() >= max_rows {
                truncated = true;
                break;
            }
            let mut record = Map::new();
            for (idx, column) in columns.iter().enumerate() {
                let value: SqlValue = row
                    .get(idx)
                    .map_err(|e| GatewayError::QueryFailed(e.to_string()))?;
                record.insert(column.clone(), json_value_from_sql(value));
            }
            out.push(record);
        }
    }
    if out.is_empty() {
        columns = column_names(statement);
    }

    Ok(MaterializedRows {
        columns,
        rows: out,
        truncated,
    })
}

fn column_names(statement: &Statement<'_>) -> Vec<String> {
    statement.column_names().iter().map(|c| c.to_string()).collect()
}

pub fn json_value_from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(bytes) => Value::String(encode_blob_hex(&bytes)),
    }
}

fn encode_blob_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push(HEX[(byte >> 4) as usize] as char);
        output.push(HEX[(byte & 0x0f) as usize] as char);
    }
    output
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
