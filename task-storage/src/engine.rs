//! The storage engine interface consumed by the manager. Engines
//! themselves — RocksDB-backed, in-memory, etc. — are out of scope; this is
//! the narrow seam the manager drives them through.

use async_trait::async_trait;

use crate::restore_iter::RestorationIterator;

/// Static properties of a store, read once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreProperties {
    pub is_logged_store: bool,
    pub is_persisted_to_disk: bool,
}

/// A store's changelog association, if it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogDescriptor {
    pub system: String,
    pub stream: String,
    pub delete_retention_ms: i64,
}

#[async_trait]
pub trait StorageEngine: Send + Sync {
    fn properties(&self) -> StoreProperties;

    /// Restores the store from `iterator`, blocking (from the caller's
    /// perspective) until it is drained. Engines pull records until the
    /// iterator signals end-of-stream.
    async fn restore(&self, iterator: Box<dyn RestorationIterator>) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn stop(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
