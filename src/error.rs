//! Error types for ai-bridge.
//!
//! All operations return `Result<T>` which aliases `Result<T, BridgeError>`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from workspace, sync and rollback operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Requested workspace root does not exist (or is not a directory).
    #[error("Path not found: {0}")]
    InvalidRoot(PathBuf),

    /// Resolved path escapes the workspace root.
    #[error("Security Violation: {0}")]
    SecurityViolation(String),

    /// Virtual path is empty or otherwise malformed.
    #[error("Invalid path '{0}': {1}")]
    InvalidPath(String, String),

    /// I/O failure while writing, backing up or restoring a single file.
    #[error("Failed to write {0}: {1}")]
    WriteFailure(String, #[source] std::io::Error),

    /// Rollback requested with no transaction on disk.
    #[error("No transactions found")]
    NoTransactions,

    /// Backup of a MODIFIED entry is missing.
    ///
    /// Not fatal for a rollback: the entry is skipped and reported.
    #[error("Backup missing for {0}")]
    CorruptBackup(String),

    /// Newest transaction's manifest is missing or unreadable.
    ///
    /// The transaction is set aside so the next rollback reaches the one
    /// before it.
    #[error("Corrupt manifest in transaction {0}")]
    CorruptManifest(String),

    /// HTTP request body did not match the expected shape.
    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    /// File system operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Manifest or registry record could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    pub(crate) fn write_failure(path: impl Into<String>, err: std::io::Error) -> Self {
        BridgeError::WriteFailure(path.into(), err)
    }

    /// Returns true for errors caused by the caller's input rather than the host.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidRoot(_)
                | BridgeError::SecurityViolation(_)
                | BridgeError::InvalidPath(..)
                | BridgeError::NoTransactions
                | BridgeError::InvalidRequest(_)
        )
    }
}

/// Result type alias for ai-bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
