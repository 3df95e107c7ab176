//! HTTP transport implementation.
//!
//! The actual HTTP client is abstracted via [`HttpClient`] so different
//! implementations can be plugged in. A blocking reqwest client is
//! available behind the `reqwest-client` feature.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{parse_key_series, SyncTransport};
use ledgersync_sync_protocol::KeySeriesReply;
use thiserror::Error;
use tracing::{debug, warn};

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

/// Failure to obtain any HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// The request timed out.
    #[error("request timed out")]
    Timeout,
    /// Connection or I/O failure.
    #[error("{0}")]
    Io(String),
}

/// HTTP client abstraction.
///
/// `post` sends a JSON body with a bearer credential and blocks until the
/// response arrives or the client's timeout expires.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request.
    fn post(&self, url: &str, bearer: &str, body: Vec<u8>) -> Result<HttpResponse, HttpError>;
}

/// HTTP-based sync transport.
pub struct HttpTransport<C: HttpClient> {
    sync_url: String,
    keys_url: String,
    client: C,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport for the endpoints in `config`.
    pub fn new(config: &SyncConfig, client: C) -> Self {
        Self {
            sync_url: config.sync_url(),
            keys_url: config.keys_url(),
            client,
        }
    }

    /// URL of the sync endpoint.
    pub fn sync_url(&self) -> &str {
        &self.sync_url
    }

    fn post(&self, url: &str, token: &str, body: Vec<u8>) -> SyncResult<Vec<u8>> {
        let response = self.client.post(url, token, body).map_err(|e| match e {
            HttpError::Timeout => SyncError::Timeout,
            HttpError::Io(message) => SyncError::transport_retryable(message),
        })?;

        match response.status {
            200..=299 => {
                debug!(url, status = response.status, bytes = response.body.len(), "request succeeded");
                Ok(response.body)
            }
            401 => Err(SyncError::Unauthorized),
            status => {
                warn!(url, status, "server rejected request");
                Err(SyncError::ServerStatus { status })
            }
        }
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    fn push(&self, token: &str, payload: &[u8]) -> SyncResult<Vec<u8>> {
        self.post(&self.sync_url, token, payload.to_vec())
    }

    fn request_key_series(&self, token: &str) -> SyncResult<KeySeriesReply> {
        let body = self.post(&self.keys_url, token, b"{}".to_vec())?;
        parse_key_series(&body)
    }
}

#[cfg(feature = "reqwest-client")]
mod reqwest_client {
    use super::{HttpClient, HttpError, HttpResponse};
    use crate::error::{SyncError, SyncResult};
    use reqwest::header::{ACCEPT, CONTENT_TYPE};
    use std::time::Duration;

    /// Blocking [`HttpClient`] backed by reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::blocking::Client,
    }

    impl ReqwestClient {
        /// Builds a client with the given request timeout.
        pub fn new(timeout: Duration) -> SyncResult<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| SyncError::transport_fatal(format!("failed to build HTTP client: {e}")))?;
            Ok(Self { client })
        }
    }

    fn map_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout
        } else {
            HttpError::Io(err.to_string())
        }
    }

    impl HttpClient for ReqwestClient {
        fn post(&self, url: &str, bearer: &str, body: Vec<u8>) -> Result<HttpResponse, HttpError> {
            let response = self
                .client
                .post(url)
                .bearer_auth(bearer)
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json")
                .body(body)
                .send()
                .map_err(map_error)?;
            let status = response.status().as_u16();
            let body = response.bytes().map_err(map_error)?.to_vec();
            Ok(HttpResponse { status, body })
        }
    }
}

#[cfg(feature = "reqwest-client")]
pub use reqwest_client::ReqwestClient;
