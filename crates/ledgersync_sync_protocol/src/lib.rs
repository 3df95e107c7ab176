//! # ledgersync sync protocol
//!
//! Wire types and the JSON codec for ledgersync's push/reply exchange.
//!
//! This crate provides:
//! - [`SyncPayload`] / [`WireRecord`] - the JSON shape sent and received
//! - [`SyncRecord`] - typed `Create | Update | Delete` records
//! - [`marshal`] - journal and revision snapshots to a push payload
//! - [`unmarshal`] - a server reply to an ordered list of store operations
//! - [`KeySeriesReply`] - the reply to a key series request
//!
//! This is a pure protocol crate with no I/O operations. Failures on single
//! records are counted and skipped; neither direction aborts a batch.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod marshal;
mod messages;
mod payload;
mod record;
mod unmarshal;

pub use error::{CodecError, CodecResult};
pub use marshal::{marshal, MarshalOutput, MarshalStats};
pub use messages::KeySeriesReply;
pub use payload::{RecordKind, SyncPayload, WireRecord};
pub use record::{RecordBuilder, SyncRecord};
pub use unmarshal::{unmarshal, unmarshal_slice, UnmarshalOutput, UnmarshalStats};
