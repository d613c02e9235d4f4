//! Query Classifier
//!
//! Decides whether a free-text query is an exclusively read-only statement.
//! Two independent layers look for denylisted keywords (tokenizer keywords and
//! a raw word-boundary scan), and a third layer looks for dangerous textual
//! patterns regardless of how the tokenizer saw them.

use crate::security::tokenizer::{tokenize, TokenKind};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Statement, DDL, administrative and transaction-control keywords that
/// disqualify a query. Order is the scan order: the first hit is reported.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT",
    "UPDATE",
    "DELETE",
    "DROP",
    "CREATE",
    "ALTER",
    "TRUNCATE",
    "REPLACE",
    "PRAGMA",
    "VACUUM",
    "ATTACH",
    "DETACH",
    "REINDEX",
    "ANALYZE",
    "BEGIN",
    "COMMIT",
    "ROLLBACK",
    "SAVEPOINT",
    "RELEASE",
];

pub const READ_STATEMENT_PREFIXES: &[&str] = &["SELECT", "WITH"];

pub const REASON_EMPTY: &str = "empty query";
pub const REASON_NOT_READ: &str = "only read statements are allowed";
pub const REASON_DANGEROUS: &str = "dangerous pattern detected";

lazy_static! {
    static ref FORBIDDEN_WORD_PATTERNS: Vec<(&'static str, Regex)> = FORBIDDEN_KEYWORDS
        .iter()
        .map(|kw| {
            let pattern = Regex::new(&format!(r"(?i)\b{}\b", kw)).expect("keyword pattern compiles");
            (*kw, pattern)
        })
        .collect();

    static ref DANGEROUS_PATTERNS: Vec<Regex> = [
        r"--",
        r"/\*",
        r"\*/",
        r";\s*\S",
        r"(?i)\bUNION\s+(ALL\s+)?SELECT\b",
        r"@@\w+",
        r"(?i)\bXP_\w+",
        r"(?i)\bSP_\w+",
        r"(?i)\bLOAD_EXTENSION\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("dangerous pattern compiles"))
    .collect();

    static ref LEADING_WORD: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").expect("leading word pattern compiles");
}

/// Result of classifying (or validating) one query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Accepted { sql: String },
    Rejected { reason: String },
}

impl ValidationOutcome {
    pub fn rejected(reason: impl Into<String>) -> Self {
        ValidationOutcome::Rejected { reason: reason.into() }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Rejected { reason } => Some(reason),
            ValidationOutcome::Accepted { .. } => None,
        }
    }

    pub fn sql(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Accepted { sql } => Some(sql),
            ValidationOutcome::Rejected { .. } => None,
        }
    }
}

pub fn forbidden_reason(keyword: &str) -> String {
    format!("forbidden keyword: {}", keyword)
}

/// Classify a raw query. Accepted outcomes carry the original text unchanged.
pub fn classify(raw_query: &str) -> ValidationOutcome {
    let outcome = classify_inner(raw_query);
    match &outcome {
        ValidationOutcome::Rejected { reason } => warn!("Rejected query ({}): {}", reason, raw_query),
        ValidationOutcome::Accepted { .. } => debug!("Accepted query: {}", raw_query),
    }
    outcome
}

fn classify_inner(raw_query: &str) -> ValidationOutcome {
    let trimmed = raw_query.trim();
    if trimmed.is_empty() {
        return ValidationOutcome::rejected(REASON_EMPTY);
    }

    if let Err(reason) = check_leading_statement(trimmed) {
        return ValidationOutcome::Rejected { reason };
    }

    let tokens = tokenize(trimmed);

    // Layer 1: keyword-typed tokens
    if let Ok(tokens) = &tokens {
        for keyword in FORBIDDEN_KEYWORDS {
            let hit = tokens
                .iter()
                .any(|t| t.kind == TokenKind::Keyword && t.text.eq_ignore_ascii_case(keyword));
            if hit {
                return ValidationOutcome::rejected(forbidden_reason(keyword));
            }
        }
    }

    // Layer 2: raw text, catches anything the tokenizer filed elsewhere
    if let Some(keyword) = first_forbidden_word(trimmed) {
        return ValidationOutcome::rejected(forbidden_reason(keyword));
    }

    if has_dangerous_pattern(trimmed) {
        return ValidationOutcome::rejected(REASON_DANGEROUS);
    }

    if let Err(e) = tokens {
        return ValidationOutcome::rejected(format!("malformed query: {}", e));
    }

    ValidationOutcome::Accepted { sql: raw_query.to_string() }
}

fn check_leading_statement(trimmed: &str) -> Result<(), String> {
    let leading = LEADING_WORD
        .find(trimmed)
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_default();

    if READ_STATEMENT_PREFIXES.contains(&leading.as_str()) {
        return Ok(());
    }
    if FORBIDDEN_KEYWORDS.contains(&leading.as_str()) {
        return Err(forbidden_reason(&leading));
    }
    Err(REASON_NOT_READ.to_string())
}

/// First denylisted keyword (in declared order) appearing anywhere as a whole word.
pub fn first_forbidden_word(query: &str) -> Option<&'static str> {
    FORBIDDEN_WORD_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(query))
        .map(|(kw, _)| *kw)
}

pub fn has_dangerous_pattern(query: &str) -> bool {
    DANGEROUS_PATTERNS.iter().any(|p| p.is_match(query))
}
