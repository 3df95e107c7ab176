//! Storage backend trait definition.

use crate::error::StorageResult;

/// A durable home for the local store's state image.
///
/// # Invariants
///
/// - `load` returns exactly the bytes of the last successful `store`, or
///   `None` if nothing was ever stored
/// - a failed `store` leaves the previously stored image untouched
/// - after `store` returns `Ok`, the image survives process termination
///   (for durable backends)
pub trait StorageBackend: Send + Sync {
    /// Loads the current image, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read or fails verification.
    fn load(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the current image with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image could not be written durably. The
    /// previous image is still in place in that case.
    fn store(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Returns the size in bytes of the current image (0 if empty).
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;
}
