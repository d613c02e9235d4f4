use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Query refused by the classifier. The reason is surfaced verbatim.
    #[error("Query rejected: {0}")]
    Rejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Empty source: {0}")]
    EmptySource(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Non-fatal: logged and recorded by the ingestor, never returned from `ingest`.
    #[error("Index creation failed: {0}")]
    IndexCreationFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for GatewayError {
    fn from(err: rusqlite::Error) -> Self {
        GatewayError::Database(err.to_string())
    }
}

impl GatewayError {
    /// Reason text of a classifier rejection, if this is one.
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            GatewayError::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
