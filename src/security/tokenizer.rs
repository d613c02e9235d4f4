//! Lightweight SQL tokenizer
//!
//! Thin layer over the `sqlparser` tokenizer (SQLite dialect) that keeps just
//! enough information for the guards: a coarse token kind, the exact source
//! text and its byte span. It does not parse statements.

use sqlparser::dialect::SQLiteDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, TokenWithLocation, Tokenizer, Whitespace};
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    StringLiteral,
    Number,
    Comment,
    Whitespace,
    Punctuation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlToken {
    pub kind: TokenKind,
    /// Source text of the token, byte-for-byte
    pub text: String,
    pub span: Range<usize>,
}

impl SqlToken {
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TokenizeError(String);

pub fn tokenize(sql: &str) -> Result<Vec<SqlToken>, TokenizeError> {
    let dialect = SQLiteDialect {};
    let located = Tokenizer::new(&dialect, sql)
        .tokenize_with_location()
        .map_err(|e| TokenizeError(e.to_string()))?;

    let line_starts = line_start_offsets(sql);
    let starts: Vec<usize> = located
        .iter()
        .map(|t| byte_offset(sql, &line_starts, t.location.line, t.location.column))
        .collect();

    let mut tokens = Vec::with_capacity(located.len());
    for (idx, TokenWithLocation { token, .. }) in located.into_iter().enumerate() {
        if matches!(token, Token::EOF) {
            continue;
        }
        let start = starts[idx];
        let end = starts.get(idx + 1).copied().unwrap_or(sql.len()).max(start);
        tokens.push(SqlToken {
            kind: classify_token(&token),
            text: sql[start..end].to_string(),
            span: start..end,
        });
    }
    Ok(tokens)
}

fn classify_token(token: &Token) -> TokenKind {
    match token {
        Token::Word(word) if word.quote_style.is_none() && word.keyword != Keyword::NoKeyword => {
            TokenKind::Keyword
        }
        Token::Word(_) => TokenKind::Identifier,
        Token::Number(_, _) => TokenKind::Number,
        Token::SingleQuotedString(_)
        | Token::DoubleQuotedString(_)
        | Token::NationalStringLiteral(_)
        | Token::EscapedStringLiteral(_)
        | Token::HexStringLiteral(_) => TokenKind::StringLiteral,
        Token::Whitespace(Whitespace::SingleLineComment { .. })
        | Token::Whitespace(Whitespace::MultiLineComment(_)) => TokenKind::Comment,
        Token::Whitespace(_) => TokenKind::Whitespace,
        _ => TokenKind::Punctuation,
    }
}

fn line_start_offsets(sql: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(sql.match_indices('\n').map(|(i, _)| i + 1));
    starts
}

/// Converts the tokenizer's 1-based (line, column-in-chars) into a byte offset.
fn byte_offset(sql: &str, line_starts: &[usize], line: u64, column: u64) -> usize {
    let line_idx = (line.max(1) - 1) as usize;
    let Some(&line_start) = line_starts.get(line_idx) else {
        return sql.len();
    };
    let skip = (column.max(1) - 1) as usize;
    sql[line_start..]
        .char_indices()
        .nth(skip)
        .map(|(i, _)| line_start + i)
        .unwrap_or(sql.len())
}
