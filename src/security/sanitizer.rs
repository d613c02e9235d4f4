//! Query Sanitizer
//!
//! Rewrites an accepted query so that it can never ask for more than
//! `max_rows` rows: one trailing terminator is stripped, a LIMIT is appended
//! when none exists, and oversized LIMIT counts are clamped in place.

use crate::security::tokenizer::{tokenize, SqlToken, TokenKind};
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;
use tracing::{debug, warn};

lazy_static! {
    static ref LIMIT_FALLBACK: Regex =
        Regex::new(r"(?i)\bLIMIT\s+(\d+)(?:\s*,\s*(\d+))?").expect("limit pattern compiles");
    static ref LIMIT_WORD: Regex = Regex::new(r"(?i)\bLIMIT\b").expect("limit word pattern compiles");
}

/// Count expression of one LIMIT clause and where it sits in the query text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LimitCount {
    /// Source span of the whole count expression
    span: Range<usize>,
    /// Set only when the count is a single decimal integer literal that fits in u64
    literal: Option<u64>,
}

impl LimitCount {
    fn within(&self, max_rows: u64) -> bool {
        matches!(self.literal, Some(v) if v <= max_rows)
    }
}

pub fn sanitize(accepted_query: &str, max_rows: u64) -> String {
    let query = strip_terminator(accepted_query);

    let limits = match tokenize(&query) {
        Ok(tokens) => limit_counts(&tokens),
        Err(e) => {
            warn!("Sanitizer could not tokenize query, using pattern scan: {}", e);
            limit_counts_fallback(&query)
        }
    };

    let Some(limits) = limits else {
        let sanitized = format!("{} LIMIT {}", query, max_rows);
        debug!("Appended row limit: {}", sanitized);
        return sanitized;
    };

    let mut sanitized = query.clone();
    // Rewrite right to left so earlier spans stay valid
    for limit in limits.iter().rev() {
        if !limit.within(max_rows) {
            sanitized.replace_range(limit.span.clone(), &max_rows.to_string());
        }
    }

    if sanitized != query {
        debug!("Clamped row limit to {}: {}", max_rows, sanitized);
    }
    sanitized
}

fn strip_terminator(query: &str) -> String {
    let trimmed = query.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
    trimmed.trim_end().to_string()
}

/// `None` when the query has no LIMIT keyword at all.
fn limit_counts(tokens: &[SqlToken]) -> Option<Vec<LimitCount>> {
    let significant: Vec<&SqlToken> = tokens.iter().filter(|t| !t.is_trivia()).collect();
    let mut counts = Vec::new();
    let mut found_limit = false;

    let mut idx = 0;
    while idx < significant.len() {
        if !significant[idx].is_keyword("LIMIT") {
            idx += 1;
            continue;
        }
        found_limit = true;

        let first_end = expression_end(&significant, idx + 1);
        // SQLite's `LIMIT offset, count` form: the second expression is the count
        let (start, end) = if significant.get(first_end).map(|t| t.text == ",").unwrap_or(false) {
            (first_end + 1, expression_end(&significant, first_end + 1))
        } else {
            (idx + 1, first_end)
        };

        if let Some(count) = count_between(&significant, start, end) {
            counts.push(count);
        }
        // LIMITs nested in the count expression are covered by its rewrite
        idx = end.max(idx + 1);
    }

    found_limit.then_some(counts)
}

/// Index of the token that ends an expression starting at `start`: a `,`,
/// `OFFSET` or unmatched `)` at depth zero, or the end of the query.
fn expression_end(significant: &[&SqlToken], start: usize) -> usize {
    let mut depth = 0usize;
    for (idx, token) in significant.iter().enumerate().skip(start) {
        match token.text.as_str() {
            "(" => depth += 1,
            ")" if depth == 0 => return idx,
            ")" => depth -= 1,
            "," if depth == 0 => return idx,
            _ if depth == 0 && token.is_keyword("OFFSET") => return idx,
            _ => {}
        }
    }
    significant.len()
}

fn count_between(significant: &[&SqlToken], start: usize, end: usize) -> Option<LimitCount> {
    if start >= end {
        return None;
    }
    let first = significant.get(start)?;
    let last = significant.get(end - 1)?;

    let literal = if end - start == 1
        && first.kind == TokenKind::Number
        && first.text.bytes().all(|b| b.is_ascii_digit())
    {
        first.text.parse::<u64>().ok()
    } else {
        None
    };

    Some(LimitCount {
        span: first.span.start..last.span.end,
        literal,
    })
}

fn limit_counts_fallback(query: &str) -> Option<Vec<LimitCount>> {
    if !LIMIT_WORD.is_match(query) {
        return None;
    }
    let counts = LIMIT_FALLBACK
        .captures_iter(query)
        .filter_map(|caps| caps.get(2).or_else(|| caps.get(1)))
        .map(|m| LimitCount {
            span: m.range(),
            literal: m.as_str().parse::<u64>().ok(),
        })
        .collect();
    Some(counts)
}
