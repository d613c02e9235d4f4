//! Query safety: tokenizer, classifier, sanitizer and the guard that chains them.

pub mod classifier;
pub mod query_guards;
pub mod sanitizer;
pub mod tokenizer;

pub use classifier::{classify, ValidationOutcome, FORBIDDEN_KEYWORDS};
pub use query_guards::SqlValidator;
pub use sanitizer::sanitize;
pub use tokenizer::{tokenize, SqlToken, TokenKind};
