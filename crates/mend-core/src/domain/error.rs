//! Domain-level error taxonomy for Mend.

/// Mend domain errors.
#[derive(Debug, thiserror::Error)]
pub enum MendError {
    #[error("invalid heal request: {0}")]
    InvalidRequest(String),

    #[error("git error: {0}")]
    Git(String),

    #[error("test execution error: {0}")]
    TestExecution(String),

    #[error("suggestion provider error: {0}")]
    Suggestion(String),

    #[error("{operation} timed out after {seconds} seconds")]
    Timeout { operation: String, seconds: u64 },

    #[error("workspace error: {0}")]
    Workspace(String),

    #[error("storage error: {0}")]
    Storage(#[from] mend_state::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Mend domain operations.
pub type Result<T> = std::result::Result<T, MendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mend_error_display() {
        let err = MendError::InvalidRequest("empty repository URL".to_string());
        assert!(err.to_string().contains("invalid heal request"));

        let err = MendError::Git("clone exited with code 128".to_string());
        assert!(err.to_string().contains("git error"));

        let err = MendError::Timeout {
            operation: "npm install".to_string(),
            seconds: 120,
        };
        assert!(err.to_string().contains("timed out after 120 seconds"));
    }

    #[test]
    fn test_suggestion_error_is_attributable() {
        let err = MendError::Suggestion("HTTP 429 from provider".to_string());
        let msg = err.to_string();
        assert!(msg.contains("suggestion provider"));
        assert!(msg.contains("429"));
    }
}
