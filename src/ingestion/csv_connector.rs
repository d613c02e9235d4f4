//! CSV Connector - Reads a delimited file into normalized header + cell lists

use crate::error::{GatewayError, Result};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

/// Textual markers read as "no value". Matched exactly, after trimming.
pub const MISSING_VALUE_MARKERS: &[&str] = &[
    "", "nan", "NaN", "-nan", "-NaN", "NA", "N/A", "n/a", "#N/A", "#N/A N/A", "#NA", "<NA>",
    "null", "NULL", "None", "1.#IND", "-1.#IND", "1.#QNAN", "-1.#QNAN",
];

/// A parsed dataset: raw header names and trimmed cells (`None` for missing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDataset {
    pub headers: Vec<String>,
    pub records: Vec<Vec<Option<String>>>,
}

impl ParsedDataset {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.records.is_empty()
    }

    /// Cells of column `idx` across all records.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.records
            .iter()
            .map(move |record| record.get(idx).and_then(|cell| cell.as_deref()))
    }
}

/// Comma-delimited reader with a header row.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvConnector;

impl CsvConnector {
    pub fn new() -> Self {
        Self
    }

    pub fn read_path(&self, path: &Path) -> Result<ParsedDataset> {
        if !path.exists() {
            return Err(GatewayError::NotFound(format!("CSV file not found: {}", path.display())));
        }
        let file = std::fs::File::open(path)?;
        self.read(file)
    }

    pub fn read<R: Read>(&self, reader: R) -> Result<ParsedDataset> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

        let mut records = Vec::new();
        for result in rdr.records() {
            let record = result?;
            // Ragged rows: missing trailing cells are null, extra cells are dropped
            let cells = (0..headers.len())
                .map(|idx| record.get(idx).and_then(normalize_cell))
                .collect();
            records.push(cells);
        }

        Ok(ParsedDataset { headers, records })
    }
}

/// Trim a cell and map missing-value markers to `None`.
pub fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if MISSING_VALUE_MARKERS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_trims_and_nulls() {
        let csv = "Order Date, Product ,qty\n2024-01-02,  widget ,3\n2024-01-03,nan,\n";
        let dataset = CsvConnector::new().read(csv.as_bytes()).unwrap();

        assert_eq!(dataset.headers, vec!["Order Date", " Product ", "qty"]);
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(
            dataset.records[0],
            vec![Some("2024-01-02".to_string()), Some("widget".to_string()), Some("3".to_string())]
        );
        assert_eq!(dataset.records[1], vec![Some("2024-01-03".to_string()), None, None]);
    }

    #[test]
    fn test_ragged_rows() {
        let csv = "a,b\n1\n2,3,4\n";
        let dataset = CsvConnector::new().read(csv.as_bytes()).unwrap();
        assert_eq!(dataset.records[0], vec![Some("1".to_string()), None]);
        assert_eq!(dataset.records[1], vec![Some("2".to_string()), Some("3".to_string())]);
    }

    #[test]
    fn test_header_only_is_empty() {
        let dataset = CsvConnector::new().read("a,b\n".as_bytes()).unwrap();
        assert!(dataset.is_empty());
        let dataset = CsvConnector::new().read("".as_bytes()).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = CsvConnector::new().read_path(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[test]
    fn test_normalize_cell() {
        assert_eq!(normalize_cell("  x "), Some("x".to_string()));
        assert_eq!(normalize_cell(" NaN "), None);
        assert_eq!(normalize_cell("none"), Some("none".to_string()));
    }
}
