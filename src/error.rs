use thiserror::Error;

/// Main error type for the recommendation service
#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No match found: {0}")]
    NotFound(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Unparseable model output: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout error: {0}")]
    Timeout(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RecommendError>;

impl RecommendError {
    /// Check if this error counts as an attempt failure the generator may retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RecommendError::Upstream(_)
                | RecommendError::Parse(_)
                | RecommendError::Validation(_)
                | RecommendError::Timeout(_)
        )
    }

    /// Get the error code for structured responses
    pub fn error_code(&self) -> &'static str {
        match self {
            RecommendError::Config(_) => "CONFIG_ERROR",
            RecommendError::NotFound(_) => "NOT_FOUND",
            RecommendError::Upstream(_) => "UPSTREAM_ERROR",
            RecommendError::Parse(_) => "PARSE_ERROR",
            RecommendError::Validation(_) => "VALIDATION_ERROR",
            RecommendError::Serialization(_) => "SERIALIZATION_ERROR",
            RecommendError::Timeout(_) => "TIMEOUT_ERROR",
        }
    }

    /// Convert to a structured error payload
    pub fn to_error_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "retryable": self.is_retryable()
            }
        })
    }
}
