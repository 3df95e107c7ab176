//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stored image failed its integrity check.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the store file.
    #[error("store locked: another process has exclusive access to {path:?}")]
    Locked {
        /// Path of the locked store file.
        path: PathBuf,
    },

    /// The backend refused the write.
    #[error("write rejected: {0}")]
    WriteRejected(String),
}
