//! High-low row-id allocation.
//!
//! The server hands out disjoint inclusive ranges of row ids, so ids
//! generated offline never collide across devices.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// An inclusive range of row ids reserved for this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySeries {
    /// Next id to hand out.
    pub next_key: i64,
    /// Last id of the range (inclusive).
    pub upper_bound: i64,
}

impl KeySeries {
    /// Creates a series, rejecting ranges that end before they begin.
    ///
    /// `next_key == upper_bound + 1` is accepted and denotes an empty series.
    /// `upper_bound` must be below `i64::MAX`.
    pub fn new(next_key: i64, upper_bound: i64) -> CoreResult<Self> {
        if upper_bound == i64::MAX || next_key > upper_bound + 1 {
            return Err(CoreError::InvalidKeySeries {
                next_key,
                upper_bound,
            });
        }
        Ok(Self {
            next_key,
            upper_bound,
        })
    }

    /// Number of ids left.
    pub fn remaining(&self) -> u64 {
        if self.next_key > self.upper_bound {
            0
        } else {
            self.upper_bound.abs_diff(self.next_key) + 1
        }
    }

    /// Takes the next id.
    pub fn take(&mut self) -> CoreResult<i64> {
        if self.next_key > self.upper_bound {
            return Err(CoreError::OutOfKeys);
        }
        let key = self.next_key;
        self.next_key += 1;
        Ok(key)
    }
}

/// Returns true if `series` should be replenished.
pub(crate) fn wants_keys(series: Option<&KeySeries>, threshold: u64) -> bool {
    series.map_or(true, |s| s.remaining() < threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_until_exhausted() {
        let mut series = KeySeries::new(10, 12).unwrap();
        assert_eq!(series.remaining(), 3);
        assert_eq!(series.take().unwrap(), 10);
        assert_eq!(series.take().unwrap(), 11);
        assert_eq!(series.take().unwrap(), 12);
        assert_eq!(series.remaining(), 0);
        assert!(matches!(series.take(), Err(CoreError::OutOfKeys)));
    }

    #[test]
    fn empty_series_is_valid() {
        let series = KeySeries::new(13, 12).unwrap();
        assert_eq!(series.remaining(), 0);
    }

    #[test]
    fn inverted_series_is_rejected() {
        assert!(matches!(
            KeySeries::new(20, 12),
            Err(CoreError::InvalidKeySeries { .. })
        ));
        assert!(KeySeries::new(1, i64::MAX).is_err());
    }

    #[test]
    fn wants_keys_threshold() {
        assert!(wants_keys(None, 1));
        let series = KeySeries::new(1, 100).unwrap();
        assert!(!wants_keys(Some(&series), 100));
        assert!(wants_keys(Some(&series), 101));
    }
}
