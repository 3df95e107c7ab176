//! Turning a server reply into store operations.

use crate::error::{CodecError, CodecResult};
use crate::payload::{RecordKind, WireRecord};
use crate::record::SyncRecord;
use ledgersync_core::StoreOperation;
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::{debug, warn};

/// Counters for one unmarshal run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnmarshalStats {
    /// Create records parsed.
    pub num_inserts: u64,
    /// Update records parsed.
    pub num_updates: u64,
    /// Delete records parsed.
    pub num_deletes: u64,
    /// Missing or malformed top-level fields.
    pub parse_exceptions: u64,
    /// Records that could not be parsed.
    pub skipped_entries: u64,
}

/// Operations derived from a reply, plus its anchor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnmarshalOutput {
    /// Creates, then updates, then deletes, each in reply order.
    pub operations: Vec<StoreOperation>,
    /// The reply's new anchor, `None` if missing or malformed.
    pub anchor: Option<u64>,
    /// Counters for this run.
    pub stats: UnmarshalStats,
}

/// Parses a reply object.
///
/// A missing or malformed `created`, `updated`, `deleted` or `anchor` field
/// counts as a parse exception; the array is treated as empty. A record
/// that cannot be parsed is skipped and counted.
pub fn unmarshal(reply: &Json) -> UnmarshalOutput {
    let mut out = UnmarshalOutput::default();

    for kind in RecordKind::ALL {
        let Some(records) = reply.get(kind.field()).and_then(Json::as_array) else {
            warn!(field = kind.field(), "reply lacks a usable array");
            out.stats.parse_exceptions += 1;
            continue;
        };
        for entry in records {
            match parse_record(kind, entry) {
                Ok(record) => {
                    match kind {
                        RecordKind::Create => out.stats.num_inserts += 1,
                        RecordKind::Update => out.stats.num_updates += 1,
                        RecordKind::Delete => out.stats.num_deletes += 1,
                    }
                    out.operations.extend(record.into_operations());
                }
                Err(err) => {
                    warn!(error = %err, kind = %kind, entry = %entry, "skipping unparseable record");
                    out.stats.skipped_entries += 1;
                }
            }
        }
    }

    out.anchor = reply.get("anchor").and_then(Json::as_u64);
    if out.anchor.is_none() {
        warn!("reply lacks a usable anchor");
        out.stats.parse_exceptions += 1;
    }

    debug!(
        inserts = out.stats.num_inserts,
        updates = out.stats.num_updates,
        deletes = out.stats.num_deletes,
        parse_exceptions = out.stats.parse_exceptions,
        skipped = out.stats.skipped_entries,
        "unmarshalled reply"
    );
    out
}

/// Parses raw reply bytes. Fails only if the bytes are not JSON.
pub fn unmarshal_slice(bytes: &[u8]) -> CodecResult<UnmarshalOutput> {
    let reply: Json = serde_json::from_slice(bytes)?;
    Ok(unmarshal(&reply))
}

fn parse_record(kind: RecordKind, entry: &Json) -> CodecResult<SyncRecord> {
    let wire = WireRecord::deserialize(entry).map_err(CodecError::from)?;
    SyncRecord::from_wire(kind, wire)
}
