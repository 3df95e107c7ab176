//! # ledgersync storage
//!
//! Durable state backends for the ledgersync local store.
//!
//! A backend persists one **opaque image** of the local store: the data
//! tables together with the sync metadata (journal, revisions, anchor and
//! key series). The image is replaced as a whole on every commit, which is
//! what makes a data write and its journal write one all-or-nothing unit.
//!
//! ## Design Principles
//!
//! - Backends never interpret the image they hold
//! - `store` either replaces the previous image completely or leaves it intact
//! - Must be `Send + Sync` so the store can be shared with a background sync
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral stores
//! - [`FileBackend`] - Atomic, checksummed, exclusively locked file
//!
//! ## Example
//!
//! ```rust
//! use ledgersync_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! assert!(backend.load().unwrap().is_none());
//! backend.store(b"{}").unwrap();
//! assert_eq!(backend.load().unwrap().as_deref(), Some(&b"{}"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
