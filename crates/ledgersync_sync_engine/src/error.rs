//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The request timed out.
    #[error("operation timed out")]
    Timeout,

    /// The server rejected the credential (HTTP 401).
    #[error("server rejected the credential")]
    Unauthorized,

    /// The server answered with an unexpected status.
    #[error("server returned status {status}")]
    ServerStatus {
        /// HTTP status code.
        status: u16,
    },

    /// No credential could be obtained.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The credential store could not be reached.
    #[error("token i/o error: {0}")]
    TokenIo(String),

    /// Sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// The reply could not be used.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local store error during apply.
    #[error("database error: {0}")]
    Database(#[from] ledgersync_core::CoreError),

    /// Another sync run is in flight.
    #[error("a sync is already running")]
    AlreadyRunning,

    /// Invalid state transition.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// `Unauthorized` is retryable: the credential was invalidated and the
    /// next attempt fetches a fresh one.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout | SyncError::Unauthorized | SyncError::TokenIo(_) => true,
            SyncError::ServerStatus { status } => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }

    /// Returns true for failures counted as IO errors.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            SyncError::Transport { .. }
                | SyncError::Timeout
                | SyncError::ServerStatus { .. }
                | SyncError::TokenIo(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::Unauthorized.is_retryable());
        assert!(SyncError::ServerStatus { status: 503 }.is_retryable());
        assert!(!SyncError::ServerStatus { status: 400 }.is_retryable());
        assert!(!SyncError::Cancelled.is_retryable());
        assert!(!SyncError::AlreadyRunning.is_retryable());
        assert!(!SyncError::Protocol("bad".into()).is_retryable());
    }

    #[test]
    fn io_classification() {
        assert!(SyncError::Timeout.is_io());
        assert!(SyncError::ServerStatus { status: 500 }.is_io());
        assert!(!SyncError::Unauthorized.is_io());
        assert!(!SyncError::AuthenticationFailed("no account".into()).is_io());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            SyncError::ServerStatus { status: 502 }.to_string(),
            "server returned status 502"
        );
        assert_eq!(SyncError::AlreadyRunning.to_string(), "a sync is already running");
    }
}
