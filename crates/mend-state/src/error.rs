//! Error types for mend-state

use thiserror::Error;

/// Errors that can occur in the persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Backend query or serialization error
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Run not found
    #[error("run not found: {run_id}")]
    RunNotFound { run_id: String },

    /// Fix not found
    #[error("fix not found: {fix_id}")]
    FixNotFound { fix_id: String },

    /// Iteration not found
    #[error("iteration {number} not found for run {run_id}")]
    IterationNotFound { run_id: String, number: u32 },

    /// Run is in the wrong state for the requested transition
    #[error("run {run_id} is {status}, expected {expected}")]
    InvalidRunState {
        run_id: String,
        status: String,
        expected: String,
    },

    /// Malformed digest string
    #[error("invalid digest: {digest}")]
    InvalidDigest { digest: String },

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
