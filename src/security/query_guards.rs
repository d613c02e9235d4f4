//! Query Guards
//!
//! Classifies a free-text query and, when it is accepted, sanitizes it
//! against the configured row ceiling.

use crate::config::DEFAULT_MAX_ROWS;
use crate::error::{GatewayError, Result};
use crate::security::classifier::{classify, ValidationOutcome};
use crate::security::sanitizer::sanitize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlValidator {
    max_rows: u64,
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl SqlValidator {
    /// Fails with `GatewayError::Config` when `max_rows` is zero.
    pub fn new(max_rows: u64) -> Result<Self> {
        if max_rows == 0 {
            return Err(GatewayError::Config("max_rows must be at least 1".to_string()));
        }
        Ok(Self { max_rows })
    }

    pub fn max_rows(&self) -> u64 {
        self.max_rows
    }

    /// Classify, then sanitize. `Accepted.sql` is the text that may be executed.
    pub fn validate(&self, raw_query: &str) -> ValidationOutcome {
        match classify(raw_query) {
            ValidationOutcome::Accepted { sql } => ValidationOutcome::Accepted {
                sql: sanitize(&sql, self.max_rows),
            },
            rejected => rejected,
        }
    }

    /// Same as `validate`, with rejections turned into `GatewayError::Rejected`.
    pub fn check(&self, raw_query: &str) -> Result<String> {
        match self.validate(raw_query) {
            ValidationOutcome::Accepted { sql } => Ok(sql),
            ValidationOutcome::Rejected { reason } => Err(GatewayError::Rejected(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sanitizes_accepted_queries() {
        let validator = SqlValidator::new(10).unwrap();
        assert_eq!(
            validator.validate("SELECT * FROM sales LIMIT 50;"),
            ValidationOutcome::Accepted {
                sql: "SELECT * FROM sales LIMIT 10".to_string()
            }
        );
    }

    #[test]
    fn test_check_surfaces_reason() {
        let validator = SqlValidator::default();
        match validator.check("DROP TABLE sales") {
            Err(GatewayError::Rejected(reason)) => assert_eq!(reason, "forbidden keyword: DROP"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_ceiling_is_rejected() {
        assert!(matches!(SqlValidator::new(0), Err(GatewayError::Config(_))));
        assert_eq!(SqlValidator::new(1).unwrap().max_rows(), 1);
    }

    #[test]
    fn test_default_ceiling() {
        assert_eq!(SqlValidator::default().max_rows(), 100);
        assert_eq!(
            SqlValidator::default().check("SELECT * FROM t").unwrap(),
            "SELECT * FROM t LIMIT 100"
        );
    }
}
