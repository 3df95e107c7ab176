//! Store configuration.

/// Configuration for opening a [`crate::DataStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether every commit is written through to the storage backend.
    ///
    /// When disabled, state is only persisted by [`crate::DataStore::flush`].
    pub sync_on_commit: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_on_commit: true,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether every commit is persisted.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }
}
