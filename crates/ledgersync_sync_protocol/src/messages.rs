//! Auxiliary protocol messages.

use serde::{Deserialize, Serialize};

/// Server reply to a key series request: an inclusive id range reserved
/// for this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySeriesReply {
    /// First id of the range.
    pub next_key: i64,
    /// Last id of the range (inclusive).
    pub upper_bound: i64,
}
