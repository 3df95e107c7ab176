//! Transport layer abstraction for sync requests.

use crate::error::{SyncError, SyncResult};
use ledgersync_sync_protocol::KeySeriesReply;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A sync transport carries requests to the sync server.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-process servers, mocks for testing).
/// Implementations map a rejected credential to
/// [`SyncError::Unauthorized`].
pub trait SyncTransport: Send + Sync {
    /// Pushes a marshalled payload and returns the raw reply body.
    fn push(&self, token: &str, payload: &[u8]) -> SyncResult<Vec<u8>>;

    /// Requests a new row-id range.
    fn request_key_series(&self, token: &str) -> SyncResult<KeySeriesReply>;
}

pub(crate) fn parse_key_series(body: &[u8]) -> SyncResult<KeySeriesReply> {
    serde_json::from_slice(body)
        .map_err(|e| SyncError::Protocol(format!("invalid key series reply: {e}")))
}

/// A scripted reply for [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// A successful reply with this body.
    Body(Vec<u8>),
    /// HTTP 401.
    Unauthorized,
    /// Any other HTTP status.
    Status(u16),
    /// A connection failure.
    Transport(String),
    /// A timeout.
    Timeout,
}

impl MockReply {
    /// A successful JSON reply.
    pub fn json(value: &serde_json::Value) -> Self {
        MockReply::Body(value.to_string().into_bytes())
    }

    fn into_result(self) -> SyncResult<Vec<u8>> {
        match self {
            MockReply::Body(body) => Ok(body),
            MockReply::Unauthorized => Err(SyncError::Unauthorized),
            MockReply::Status(status) => Err(SyncError::ServerStatus { status }),
            MockReply::Transport(message) => Err(SyncError::transport_retryable(message)),
            MockReply::Timeout => Err(SyncError::Timeout),
        }
    }
}

/// A mock transport for testing.
///
/// Replies are served in the order they were queued; every pushed body is
/// recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    key_replies: Mutex<VecDeque<MockReply>>,
    pushed: Mutex<Vec<Vec<u8>>>,
    tokens: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for the next push.
    pub fn enqueue(&self, reply: MockReply) {
        self.replies.lock().push_back(reply);
    }

    /// Queues a reply for the next key series request.
    pub fn enqueue_keys(&self, reply: MockReply) {
        self.key_replies.lock().push_back(reply);
    }

    /// Bodies pushed so far.
    pub fn pushed(&self) -> Vec<Vec<u8>> {
        self.pushed.lock().clone()
    }

    /// Number of pushes so far.
    pub fn push_count(&self) -> usize {
        self.pushed.lock().len()
    }

    /// Tokens presented so far, key requests included.
    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens.lock().clone()
    }
}

impl SyncTransport for MockTransport {
    fn push(&self, token: &str, payload: &[u8]) -> SyncResult<Vec<u8>> {
        self.tokens.lock().push(token.to_string());
        self.pushed.lock().push(payload.to_vec());
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| SyncError::Protocol("no mock reply queued".into()))?
            .into_result()
    }

    fn request_key_series(&self, token: &str) -> SyncResult<KeySeriesReply> {
        self.tokens.lock().push(token.to_string());
        let body = self
            .key_replies
            .lock()
            .pop_front()
            .ok_or_else(|| SyncError::Protocol("no mock key reply queued".into()))?
            .into_result()?;
        parse_key_series(&body)
    }
}
