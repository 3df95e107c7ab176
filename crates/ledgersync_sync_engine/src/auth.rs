//! Bearer credential acquisition.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

/// Why a credential could not be obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The user or the platform cancelled the request.
    #[error("token request cancelled")]
    Cancelled,
    /// The account could not be authenticated.
    #[error("authentication failed: {0}")]
    Failed(String),
    /// The credential store was unreachable.
    #[error("token i/o error: {0}")]
    Io(String),
}

/// Source of bearer credentials for the sync server.
///
/// `get_token` may block (for example on an account manager); it is only
/// called from the sync run itself.
pub trait TokenProvider: Send + Sync {
    /// Returns a credential for the next request.
    fn get_token(&self) -> Result<String, AuthError>;

    /// Marks `token` as rejected by the server.
    fn invalidate_token(&self, token: &str);
}

/// A provider that hands out a fixed token, or a fixed failure.
#[derive(Debug)]
pub struct StaticTokenProvider {
    token: RwLock<Result<String, AuthError>>,
    invalidations: AtomicU64,
}

impl StaticTokenProvider {
    /// Creates a provider for `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_result(Ok(token.into()))
    }

    /// Creates a provider with no token; every request fails.
    pub fn unauthenticated() -> Self {
        Self::with_result(Err(AuthError::Failed("no token configured".into())))
    }

    fn with_result(token: Result<String, AuthError>) -> Self {
        Self {
            token: RwLock::new(token),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Replaces the token.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Ok(token.into());
    }

    /// Makes every following request fail with `error`.
    pub fn set_token_error(&self, error: AuthError) {
        *self.token.write() = Err(error);
    }

    /// How often a token was reported as rejected.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl TokenProvider for StaticTokenProvider {
    fn get_token(&self) -> Result<String, AuthError> {
        self.token.read().clone()
    }

    fn invalidate_token(&self, _token: &str) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        debug!("token invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_provider() {
        let provider = StaticTokenProvider::new("secret");
        assert_eq!(provider.get_token().unwrap(), "secret");
        provider.invalidate_token("secret");
        assert_eq!(provider.invalidations(), 1);
        provider.set_token("other");
        assert_eq!(provider.get_token().unwrap(), "other");
    }

    #[test]
    fn unauthenticated_provider_fails() {
        let provider = StaticTokenProvider::unauthenticated();
        assert!(matches!(provider.get_token(), Err(AuthError::Failed(_))));
        provider.set_token_error(AuthError::Io("keystore locked".into()));
        assert_eq!(
            provider.get_token(),
            Err(AuthError::Io("keystore locked".into()))
        );
    }
}
