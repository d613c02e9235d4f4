use sql_gateway::config::GatewayConfig;
use sql_gateway::error::GatewayError;
use sql_gateway::execution::{ExecutionEngine, QueryExecutor};
use sql_gateway::gateway::SqlGateway;
use sql_gateway::security::{classify, sanitize, SqlValidator, FORBIDDEN_KEYWORDS};
use sql_gateway::tools::{GatewayTools, ToolCall, RUN_SQL_QUERY};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn open(dir: &Path, max_rows: u64) -> SqlGateway {
    SqlGateway::open(&GatewayConfig::new(dir.join("app.db")).with_max_rows(max_rows)).unwrap()
}

#[test]
fn test_end_to_end_three_row_table() {
    let temp_dir = TempDir::new().unwrap();
    let csv = write_csv(temp_dir.path(), "t.csv", "city,visits\nOslo,3\nLima,5\nPune,8\n");

    let gateway = open(temp_dir.path(), 100);
    gateway.load_csv(&csv, "t").unwrap();

    assert!(gateway.schema().list_tables().unwrap().contains(&"t".to_string()));
    assert_eq!(gateway.schema().describe_table("t").unwrap().row_count, 3);

    let all = gateway.run_query("SELECT * FROM t").unwrap();
    assert_eq!(all.row_count, 3);
    assert_eq!(all.columns, vec!["city", "visits"]);
    let keys: Vec<&String> = all.rows[0].keys().collect();
    assert_eq!(keys, vec!["city", "visits"]);
    assert_eq!(all.rows[2]["visits"], json!(8));

    // Same store, tighter ceiling
    let capped = open(temp_dir.path(), 2);
    let clamped = capped.run_query("SELECT * FROM t LIMIT 999").unwrap();
    assert_eq!(clamped.sql_query, "SELECT * FROM t LIMIT 2");
    assert_eq!(clamped.row_count, 2);
}

#[test]
fn test_leading_denylisted_keyword_is_named() {
    for keyword in FORBIDDEN_KEYWORDS {
        let query = format!("{} something", keyword);
        let outcome = classify(&query);
        assert_eq!(
            outcome.reason(),
            Some(format!("forbidden keyword: {}", keyword).as_str()),
            "wrong reason for {query}"
        );
    }
    assert_eq!(classify("drop table t").reason(), Some("forbidden keyword: DROP"));
}

#[test]
fn test_documented_rejections() {
    assert_eq!(classify("").reason(), Some("empty query"));
    assert_eq!(classify("   \n\t").reason(), Some("empty query"));
    assert!(!classify("SELECT * FROM sales; DROP TABLE sales").is_accepted());
    assert!(!classify("SELECT * FROM sales -- comment").is_accepted());
    assert!(!classify("SELECT * FROM sales /* hidden */").is_accepted());
    assert!(!classify("SELECT name FROM a UNION SELECT password FROM b").is_accepted());
    assert!(!classify("SELECT load_extension('evil.so')").is_accepted());
}

#[test]
fn test_sanitize_properties() {
    let validator = SqlValidator::new(50).unwrap();
    let queries = [
        "SELECT * FROM sales",
        "SELECT * FROM sales;",
        "WITH x AS (SELECT 1 AS n) SELECT n FROM x",
        "SELECT * FROM sales LIMIT 10",
        "SELECT * FROM sales LIMIT 5000",
        "SELECT * FROM sales LIMIT 10, 5000",
        "SELECT * FROM sales WHERE note = 'LIMIT 9' ORDER BY 1",
        "SELECT * FROM sales LIMIT 5 * 1000",
        "SELECT * FROM sales LIMIT 0x7fffffff",
        "SELECT * FROM sales LIMIT 1 + 999 OFFSET 0",
    ];

    for query in queries {
        let sanitized = validator.validate(query).sql().map(str::to_string).unwrap();
        assert_eq!(sanitize(&sanitized, 50), sanitized, "not idempotent: {query}");
    }

    assert_eq!(sanitize("SELECT * FROM sales", 50), "SELECT * FROM sales LIMIT 50");
    assert_eq!(sanitize("SELECT * FROM sales LIMIT 10", 50), "SELECT * FROM sales LIMIT 10");
    assert_eq!(sanitize("SELECT * FROM sales LIMIT 5000", 50), "SELECT * FROM sales LIMIT 50");
    assert_eq!(
        sanitize("SELECT * FROM sales WHERE note = 'LIMIT 9' ORDER BY 1", 50),
        "SELECT * FROM sales WHERE note = 'LIMIT 9' ORDER BY 1 LIMIT 50"
    );
}

#[test]
fn test_missing_table_errors() {
    let temp_dir = TempDir::new().unwrap();
    let gateway = open(temp_dir.path(), 100);

    assert!(matches!(
        gateway.schema().describe_table("ghost"),
        Err(GatewayError::NotFound(_))
    ));
    assert!(matches!(
        gateway.run_query("SELECT * FROM ghost"),
        Err(GatewayError::QueryFailed(_))
    ));
}

#[test]
fn test_expression_limits_and_engine_cap() {
    let temp_dir = TempDir::new().unwrap();
    let csv = write_csv(
        temp_dir.path(),
        "n.csv",
        &(0..30).fold(String::from("n\n"), |mut acc, i| {
            acc.push_str(&format!("{}\n", i));
            acc
        }),
    );
    let gateway = open(temp_dir.path(), 10);
    gateway.load_csv(&csv, "n").unwrap();

    // Computed counts are replaced by the ceiling before execution
    for query in [
        "SELECT * FROM n LIMIT (SELECT 25)",
        "SELECT * FROM n LIMIT 5 * 1000",
        "SELECT * FROM n LIMIT 0x7fffffff",
        "SELECT * FROM n LIMIT 1 + 999 OFFSET 0",
    ] {
        let result = gateway.run_query(query).unwrap();
        assert!(result.sql_query.contains("LIMIT 10"), "not clamped: {}", result.sql_query);
        assert_eq!(result.row_count, 10, "wrong row count for {query}");
        assert!(!result.truncated);
    }

    // The engine caps text that skipped the sanitizer
    let engine = ExecutionEngine::new(Arc::clone(gateway.store()), 10).unwrap();
    let capped = engine.execute("SELECT * FROM n LIMIT 25").unwrap();
    assert_eq!(capped.row_count, 10);
    assert!(capped.truncated);

    assert!(matches!(
        engine.execute("UPDATE n SET n = 0"),
        Err(GatewayError::QueryFailed(_))
    ));
    assert_eq!(
        gateway.run_query("SELECT COUNT(*) AS c FROM n WHERE n = 0").unwrap().rows[0]["c"],
        json!(1)
    );
}

#[test]
fn test_tool_call_returns_structured_execution() {
    let temp_dir = TempDir::new().unwrap();
    let csv = write_csv(temp_dir.path(), "t.csv", "a,b\n1,x\n2,y\n");
    let gateway = open(temp_dir.path(), 100);
    gateway.load_csv(&csv, "t").unwrap();

    let tools = GatewayTools::new(&gateway);
    let output = tools.call(&ToolCall::new(RUN_SQL_QUERY).with_param("sql_query", "SELECT b FROM t ORDER BY a DESC"));
    let execution = output.execution.unwrap();
    assert_eq!(execution.sql_query, "SELECT b FROM t ORDER BY a DESC LIMIT 100");
    assert_eq!(execution.rows[0]["b"], json!("y"));
    assert!(output.text.contains("SQL executed: SELECT b FROM t ORDER BY a DESC LIMIT 100"));
}
