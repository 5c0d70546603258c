use thiserror::Error;

/// Error types that can occur while loading, evaluating, or writing a batch.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Input dataset missing, unreadable, or malformed
    #[error("Data source error: {0}")]
    DataSource(String),
    /// Required configuration value absent
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Authentication and authorization errors
    #[error("Auth error: {0}")]
    Auth(String),
    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    Http(String),
    /// Evaluator response parsing or format error
    #[error("Response format error: {message}. Raw response: {raw_response}")]
    ResponseFormat {
        message: String,
        raw_response: String,
    },
    /// JSON serialization/deserialization errors
    #[error("JSON parse error: {0}")]
    Json(String),
    /// Output destination cannot be opened or written
    #[error("Write error: {0}")]
    Write(String),
    /// Retry attempts exceeded
    #[error("Retry attempts exceeded after {attempts} tries: {last_error}")]
    RetryExceeded { attempts: usize, last_error: String },
}

/// Converts reqwest HTTP errors into EvalErrors
impl From<reqwest::Error> for EvalError {
    fn from(err: reqwest::Error) -> Self {
        EvalError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::Json(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}

impl From<csv::Error> for EvalError {
    fn from(err: csv::Error) -> Self {
        EvalError::DataSource(err.to_string())
    }
}
