//! Schema Inference - Deterministic column typing from parsed CSV cells

use crate::ingestion::csv_connector::ParsedDataset;
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Storage type chosen for a loaded column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Real,
    /// Stored as INTEGER 1/0
    Boolean,
    Text,
}

impl ColumnType {
    /// Declared SQL type used in CREATE TABLE.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    fn detect(cell: &str) -> Self {
        if cell.parse::<i64>().is_ok() {
            ColumnType::Integer
        } else if parse_bool(cell).is_some() {
            ColumnType::Boolean
        } else if cell.parse::<f64>().is_ok() {
            ColumnType::Real
        } else {
            ColumnType::Text
        }
    }

    /// Widen two observed types. INTEGER + REAL → REAL; any other mix → TEXT.
    fn merge(self, other: ColumnType) -> ColumnType {
        match (self, other) {
            (a, b) if a == b => a,
            (ColumnType::Integer, ColumnType::Real) | (ColumnType::Real, ColumnType::Integer) => ColumnType::Real,
            _ => ColumnType::Text,
        }
    }

    /// Convert a non-missing cell into the stored value for this column type.
    pub fn to_sql_value(&self, cell: Option<&str>) -> SqlValue {
        let Some(cell) = cell else {
            return SqlValue::Null;
        };
        match self {
            ColumnType::Integer => cell
                .parse::<i64>()
                .map(SqlValue::Integer)
                .unwrap_or_else(|_| SqlValue::Text(cell.to_string())),
            ColumnType::Real => cell
                .parse::<f64>()
                .map(SqlValue::Real)
                .unwrap_or_else(|_| SqlValue::Text(cell.to_string())),
            ColumnType::Boolean => parse_bool(cell)
                .map(|b| SqlValue::Integer(i64::from(b)))
                .unwrap_or_else(|| SqlValue::Text(cell.to_string())),
            ColumnType::Text => SqlValue::Text(cell.to_string()),
        }
    }
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredColumn {
    /// Normalized column name
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSchema {
    pub table_name: String,
    pub columns: Vec<InferredColumn>,
}

impl InferredSchema {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Trim, turn spaces into underscores, lowercase.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().replace(' ', "_").to_lowercase()
}

/// Normalize headers, naming blanks `unnamed_<pos>` and suffixing repeats `_1`, `_2`, ...
pub fn normalize_headers(headers: &[String]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(headers.len());

    for (pos, header) in headers.iter().enumerate() {
        let mut base = normalize_identifier(header);
        if base.is_empty() {
            base = format!("unnamed_{}", pos);
        }

        let mut candidate = base.clone();
        let mut suffix = 1;
        while used.contains(&candidate) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        used.insert(candidate.clone());
        names.push(candidate);
    }
    names
}

pub struct SchemaInference;

impl SchemaInference {
    pub fn new() -> Self {
        Self
    }

    pub fn infer_schema(&self, table_name: &str, dataset: &ParsedDataset) -> InferredSchema {
        let names = normalize_headers(&dataset.headers);
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let mut observed: Option<ColumnType> = None;
                let mut nullable = false;
                for cell in dataset.column(idx) {
                    match cell {
                        Some(value) => {
                            let detected = ColumnType::detect(value);
                            observed = Some(observed.map_or(detected, |t| t.merge(detected)));
                        }
                        None => nullable = true,
                    }
                }
                InferredColumn {
                    name,
                    // All-missing columns carry no type evidence
                    column_type: observed.unwrap_or(ColumnType::Text),
                    nullable,
                }
            })
            .collect();

        InferredSchema {
            table_name: table_name.to_string(),
            columns,
        }
    }
}

impl Default for SchemaInference {
    fn default() -> Self {
        Self::new()
    }
}
