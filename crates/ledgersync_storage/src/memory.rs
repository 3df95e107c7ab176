//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An in-memory storage backend.
///
/// This backend keeps the image in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// Clones share the same image, so a test can keep a handle and observe
/// what the store committed, or make the next writes fail with
/// [`InMemoryBackend::reject_writes`].
///
/// # Example
///
/// ```rust
/// use ledgersync_storage::{InMemoryBackend, StorageBackend};
///
/// let mut backend = InMemoryBackend::new();
/// backend.store(b"state").unwrap();
/// assert_eq!(backend.size().unwrap(), 5);
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    image: Arc<RwLock<Option<Vec<u8>>>>,
    reject: Arc<AtomicBool>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend holding a pre-existing image.
    ///
    /// Useful for testing reopen scenarios.
    #[must_use]
    pub fn with_image(image: Vec<u8>) -> Self {
        Self {
            image: Arc::new(RwLock::new(Some(image))),
            reject: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a copy of the current image.
    #[must_use]
    pub fn image(&self) -> Option<Vec<u8>> {
        self.image.read().clone()
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn reject_writes(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

impl StorageBackend for InMemoryBackend {
    fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.image.read().clone())
    }

    fn store(&mut self, data: &[u8]) -> StorageResult<()> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected(
                "in-memory backend is rejecting writes".into(),
            ));
        }
        *self.image.write() = Some(data.to_vec());
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.image.read().as_ref().map_or(0, |i| i.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn memory_store_replaces_image() {
        let mut backend = InMemoryBackend::new();
        backend.store(b"first").unwrap();
        backend.store(b"second").unwrap();

        assert_eq!(backend.load().unwrap().unwrap(), b"second");
        assert_eq!(backend.size().unwrap(), 6);
    }

    #[test]
    fn memory_with_image() {
        let backend = InMemoryBackend::with_image(b"preloaded".to_vec());
        assert_eq!(backend.size().unwrap(), 9);
        assert_eq!(backend.load().unwrap().unwrap(), b"preloaded");
    }

    #[test]
    fn memory_clones_share_image() {
        let mut backend = InMemoryBackend::new();
        let observer = backend.clone();
        backend.store(b"shared").unwrap();
        assert_eq!(observer.image().unwrap(), b"shared");
    }

    #[test]
    fn memory_rejected_write_keeps_previous_image() {
        let mut backend = InMemoryBackend::new();
        backend.store(b"kept").unwrap();

        backend.reject_writes(true);
        let result = backend.store(b"lost");
        assert!(matches!(result, Err(StorageError::WriteRejected(_))));
        assert_eq!(backend.load().unwrap().unwrap(), b"kept");

        backend.reject_writes(false);
        backend.store(b"again").unwrap();
        assert_eq!(backend.load().unwrap().unwrap(), b"again");
    }
}
