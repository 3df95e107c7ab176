//! # ledgersync sync engine
//!
//! Drives one sync round between a local [`DataStore`] and the server.
//!
//! This crate provides:
//! - [`SyncEngine`] - the token → snapshot → marshal → push → unmarshal →
//!   apply state machine
//! - Retry with exponential backoff and jitter
//! - [`TokenProvider`] - bearer credential abstraction
//! - [`SyncTransport`] / [`HttpTransport`] - network abstraction, with an
//!   optional reqwest client behind the `reqwest-client` feature
//! - [`spawn_sync`] - run a sync on tokio's blocking pool
//!
//! ## Key Invariants
//!
//! - Nothing local changes before Apply; a failed or cancelled run leaves
//!   journal, revisions and anchor exactly as they were
//! - Apply is one transaction: acknowledgements, then server changes, then
//!   the new anchor
//! - Server-origin changes are applied with journaling suspended
//! - At most one sync runs at a time per engine
//!
//! [`DataStore`]: ledgersync_core::DataStore

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod background;
mod config;
mod error;
mod http;
mod state;
mod transport;

pub use auth::{AuthError, StaticTokenProvider, TokenProvider};
pub use background::{spawn_sync, spawn_sync_with_retry};
pub use config::{RetryConfig, SyncConfig};
pub use error::{SyncError, SyncResult};
#[cfg(feature = "reqwest-client")]
pub use http::ReqwestClient;
pub use http::{HttpClient, HttpError, HttpResponse, HttpTransport};
pub use state::{SyncEngine, SyncReport, SyncState, SyncStats};
pub use transport::{MockReply, MockTransport, SyncTransport};
