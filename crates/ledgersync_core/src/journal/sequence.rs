//! Journal sequence allocation.

use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug)]
struct AllocatorState {
    next: u64,
    needs_update: bool,
}

/// Hands out journal sequence numbers.
///
/// The counter is initialized lazily from persisted state the first time a
/// number is requested, and again after [`SequenceAllocator::invalidate`].
/// Re-initialization never moves the counter backwards, so numbers issued
/// by one allocator are strictly increasing apart from reclaimed ones.
#[derive(Debug)]
pub struct SequenceAllocator {
    state: Mutex<AllocatorState>,
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceAllocator {
    /// Creates an allocator that loads its counter on first use.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AllocatorState {
                next: 0,
                needs_update: true,
            }),
        }
    }

    /// Returns the next sequence number.
    ///
    /// `load` yields the persisted anchor and the highest journal sequence;
    /// it is only called when the counter needs (re)initialization.
    pub fn next_sequence<F>(&self, load: F) -> u64
    where
        F: FnOnce() -> (u64, Option<u64>),
    {
        let mut state = self.state.lock();
        if state.needs_update {
            let (anchor, max_sequence) = load();
            let persisted = max_sequence.map_or(anchor, |max| anchor.max(max + 1));
            state.next = state.next.max(persisted);
            state.needs_update = false;
            debug!(
                anchor,
                max_sequence = ?max_sequence,
                next = state.next,
                "initialized sequence counter"
            );
        }
        let sequence = state.next;
        state.next += 1;
        sequence
    }

    /// Gives back `sequence` if it was the last number issued.
    ///
    /// Returns false (and changes nothing) if another number was issued
    /// since, or if the counter awaits re-initialization.
    pub fn return_sequence(&self, sequence: u64) -> bool {
        let mut state = self.state.lock();
        if !state.needs_update && state.next == sequence + 1 {
            state.next = sequence;
            true
        } else {
            false
        }
    }

    /// Forces re-initialization from persisted state on next use.
    pub fn invalidate(&self) {
        self.state.lock().needs_update = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializes_from_anchor_and_journal() {
        let alloc = SequenceAllocator::new();
        assert_eq!(alloc.next_sequence(|| (10, Some(4))), 10);

        let alloc = SequenceAllocator::new();
        assert_eq!(alloc.next_sequence(|| (2, Some(8))), 9);

        let alloc = SequenceAllocator::new();
        assert_eq!(alloc.next_sequence(|| (0, None)), 0);
    }

    #[test]
    fn load_runs_once_until_invalidated() {
        let alloc = SequenceAllocator::new();
        assert_eq!(alloc.next_sequence(|| (0, None)), 0);
        assert_eq!(alloc.next_sequence(|| unreachable!()), 1);
        alloc.invalidate();
        assert_eq!(alloc.next_sequence(|| (20, Some(1))), 20);
    }

    #[test]
    fn reinitialization_never_goes_backwards() {
        let alloc = SequenceAllocator::new();
        for _ in 0..6 {
            alloc.next_sequence(|| (0, None));
        }
        alloc.invalidate();
        // Persisted state lags behind: entries 4 and 5 were compacted away.
        assert_eq!(alloc.next_sequence(|| (0, Some(3))), 6);
    }

    #[test]
    fn return_only_last_issued() {
        let alloc = SequenceAllocator::new();
        let a = alloc.next_sequence(|| (0, None));
        let b = alloc.next_sequence(|| (0, None));
        assert!(!alloc.return_sequence(a));
        assert!(alloc.return_sequence(b));
        assert_eq!(alloc.next_sequence(|| (0, None)), b);
    }

    #[test]
    fn concurrent_callers_get_unique_increasing_numbers() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;

        let alloc = SequenceAllocator::new();
        let kept: Vec<Vec<u64>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        let mut kept = Vec::with_capacity(PER_THREAD);
                        let mut returned = false;
                        while kept.len() < PER_THREAD {
                            let sequence = alloc.next_sequence(|| (0, None));
                            // Hand some numbers back; those may be reissued.
                            if !returned && sequence % 3 == 0 && alloc.return_sequence(sequence) {
                                returned = true;
                                continue;
                            }
                            returned = false;
                            kept.push(sequence);
                        }
                        kept
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for numbers in &kept {
            assert!(numbers.windows(2).all(|pair| pair[0] < pair[1]));
        }
        let mut all: Vec<u64> = kept.into_iter().flatten().collect();
        let issued = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), issued);
        assert_eq!(issued, THREADS * PER_THREAD);
    }

    #[test]
    fn return_fails_while_invalidated() {
        let alloc = SequenceAllocator::new();
        let a = alloc.next_sequence(|| (0, None));
        alloc.invalidate();
        assert!(!alloc.return_sequence(a));
    }
}
