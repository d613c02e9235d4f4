//! Agent tool surface
//!
//! Describes the three tools an upstream agent may call and renders their
//! results as text. `run_sql_query` also returns the structured
//! `QueryExecution` so callers never have to parse the rendered grid.

use crate::db::{DatabaseSummary, TableSchema};
use crate::execution::QueryExecution;
use crate::gateway::SqlGateway;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{error, info};

pub const LIST_TABLES: &str = "list_tables";
pub const DESCRIBE_TABLE_SCHEMA: &str = "describe_table_schema";
pub const RUN_SQL_QUERY: &str = "run_sql_query";

const SAMPLE_CELL_WIDTH: usize = 15;
const MIN_COLUMN_WIDTH: usize = 10;
const MAX_COLUMN_WIDTH: usize = 20;
/// Rows consulted when sizing result grid columns
const WIDTH_SAMPLE_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    pub parameter_type: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    fn str_param(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub text: String,
    /// Present only for a successful `run_sql_query`
    pub execution: Option<QueryExecution>,
}

impl ToolOutput {
    fn text(text: String) -> Self {
        Self { text, execution: None }
    }
}

pub struct GatewayTools<'a> {
    gateway: &'a SqlGateway,
}

impl<'a> GatewayTools<'a> {
    pub fn new(gateway: &'a SqlGateway) -> Self {
        Self { gateway }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: LIST_TABLES.to_string(),
                description: "List all available tables in the database. Use this to discover what data is available for querying.".to_string(),
                parameters: Vec::new(),
            },
            ToolDefinition {
                name: DESCRIBE_TABLE_SCHEMA.to_string(),
                description: "Get column names and types, the row count and up to 5 sample rows for a table. Use this before writing SQL against it.".to_string(),
                parameters: vec![ToolParameter {
                    name: "table_name".to_string(),
                    description: "Name of the table to describe".to_string(),
                    parameter_type: "string".to_string(),
                    required: true,
                }],
            },
            ToolDefinition {
                name: RUN_SQL_QUERY.to_string(),
                description: format!(
                    "Execute a read-only SELECT query. Only SELECT/WITH statements are allowed and at most {} rows are returned. Queries are validated before they run.",
                    self.gateway.max_rows()
                ),
                parameters: vec![ToolParameter {
                    name: "sql_query".to_string(),
                    description: "The SELECT statement to execute".to_string(),
                    parameter_type: "string".to_string(),
                    required: true,
                }],
            },
        ]
    }

    /// Dispatch a call by tool name. Failures are reported in the text.
    pub fn call(&self, call: &ToolCall) -> ToolOutput {
        match call.tool_name.as_str() {
            LIST_TABLES => ToolOutput::text(self.list_tables()),
            DESCRIBE_TABLE_SCHEMA => match call.str_param("table_name") {
                Some(table) => ToolOutput::text(self.describe_table_schema(table)),
                None => ToolOutput::text(missing_parameter(DESCRIBE_TABLE_SCHEMA, "table_name")),
            },
            RUN_SQL_QUERY => match call.str_param("sql_query") {
                Some(sql) => self.run_sql_query(sql),
                None => ToolOutput::text(missing_parameter(RUN_SQL_QUERY, "sql_query")),
            },
            other => ToolOutput::text(format!("Unknown tool '{}'", other)),
        }
    }

    pub fn list_tables(&self) -> String {
        info!("Listing all tables");
        match self.gateway.schema().database_summary() {
            Ok(summary) => render_table_list(&summary),
            Err(e) => {
                let message = format!("Error listing tables: {}", e);
                error!("{}", message);
                message
            }
        }
    }

    pub fn describe_table_schema(&self, table_name: &str) -> String {
        info!("Describing schema for table: {}", table_name);
        match self.gateway.schema().describe_table(table_name) {
            Ok(schema) => render_table_schema(&schema),
            Err(e) => {
                let message = format!("Error describing table schema: {}", e);
                error!("{}", message);
                message
            }
        }
    }

    pub fn run_sql_query(&self, sql_query: &str) -> ToolOutput {
        info!("Executing SQL query: {}", sql_query);
        match self.gateway.run_query(sql_query) {
            Ok(execution) => ToolOutput {
                text: render_query_result(&execution),
                execution: Some(execution),
            },
            Err(e) => {
                let message = format!("Error executing SQL query: {}", e);
                error!("{}", message);
                ToolOutput::text(message)
            }
        }
    }
}

fn missing_parameter(tool: &str, parameter: &str) -> String {
    format!("Missing required parameter '{}' for {}", parameter, tool)
}

pub fn render_table_list(summary: &DatabaseSummary) -> String {
    if summary.tables.is_empty() {
        return "No tables found in the database.".to_string();
    }
    let mut out = format!("Available tables ({}):\n", summary.total_tables);
    for (i, table) in summary.tables.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, table));
    }
    out.push_str(&format!("\nDatabase path: {}", summary.db_path));
    out
}

pub fn render_table_schema(schema: &TableSchema) -> String {
    let mut out = format!("Table: {}\nTotal rows: {}\n\nColumns:\n", schema.table_name, schema.row_count);
    for column in &schema.columns {
        let pk = if column.primary_key { " (PRIMARY KEY)" } else { "" };
        let null = if column.nullable { " (NULLABLE)" } else { " (NOT NULL)" };
        out.push_str(&format!("  - {}: {}{}{}\n", column.name, column.data_type, pk, null));
    }

    if !schema.sample_rows.is_empty() {
        out.push_str(&format!("\nSample data (first {} rows):\n", schema.sample_rows.len()));
        let headers = schema.column_names();
        let header_line = headers
            .iter()
            .map(|h| pad(&fit(h, SAMPLE_CELL_WIDTH), SAMPLE_CELL_WIDTH))
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(&format!("{}\n{}\n", header_line, "-".repeat(header_line.chars().count())));
        for row in &schema.sample_rows {
            let line = headers
                .iter()
                .map(|h| pad(&fit(&cell_text(row.get(*h)), SAMPLE_CELL_WIDTH), SAMPLE_CELL_WIDTH))
                .collect::<Vec<_>>()
                .join(" | ");
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

pub fn render_query_result(execution: &QueryExecution) -> String {
    if execution.is_empty() {
        return format!(
            "Query executed successfully but returned no results.\n\nSQL: {}\nExecution time: {}ms",
            execution.sql_query, execution.execution_time_ms
        );
    }

    let widths: Vec<usize> = execution
        .columns
        .iter()
        .map(|column| {
            let widest_value = execution
                .rows
                .iter()
                .take(WIDTH_SAMPLE_ROWS)
                .map(|row| cell_text(row.get(column)).chars().count())
                .max()
                .unwrap_or(0);
            column
                .chars()
                .count()
                .max(widest_value)
                .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut out = format!(
        "Query Results ({} rows, {}ms):\n\n",
        execution.row_count, execution.execution_time_ms
    );
    let header_line = execution
        .columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| pad(&fit(column, *width), *width))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(&format!("{}\n{}\n", header_line, "-".repeat(header_line.chars().count())));

    for row in &execution.rows {
        let line = execution
            .columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| pad(&fit(&cell_text(row.get(column)), *width), *width))
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(&line);
        out.push('\n');
    }

    if execution.truncated {
        out.push_str(&format!("\n(result truncated at {} rows)\n", execution.row_count));
    }
    out.push_str(&format!("\nSQL executed: {}", execution.sql_query));
    out
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Cut `text` to `width` chars, ending in "..." when shortened.
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}
