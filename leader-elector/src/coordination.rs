//! The coordination-service seam: a hierarchical, ZooKeeper-like tree of
//! ephemeral sequential nodes, not a flat prefixed-KV store. The election
//! algorithm needs ephemeral sequential children and a way to watch a
//! single node for deletion or change, so the trait is shaped around
//! exactly that.

use async_trait::async_trait;

use crate::error::Result;

/// An event delivered on a [`WatchSubscription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The watched node's data changed.
    Changed,
    /// The watched node was deleted.
    Deleted,
}

/// A live watch on one node. Dropping this (or letting it go out of scope)
/// is the unsubscribe: there is no separate `unwatch` call, since the
/// subscription's lifetime already models it.
pub struct WatchSubscription {
    pub(crate) rx: tokio::sync::mpsc::Receiver<WatchEvent>,
}

impl WatchSubscription {
    pub fn new(rx: tokio::sync::mpsc::Receiver<WatchEvent>) -> Self {
        Self { rx }
    }

    /// Waits for the next event. Resolves to `None` once the coordination
    /// service drops its sender, e.g. because the node no longer exists and
    /// no further events will ever arrive.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }
}

/// The tree operations the leader elector needs from the coordination
/// service. An implementor owns the session/connection lifecycle; any
/// disconnect that invalidates ephemeral nodes should surface as
/// `Error::Coordination` from the affected call, letting the elector's
/// retry loop decide whether to re-register.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// Creates a new ephemeral sequential child of `parent`, carrying
    /// `payload` as its data, and returns the full path assigned to it
    /// (parent joined with a coordination-service-assigned, monotonically
    /// increasing sequence suffix). The node is removed automatically when
    /// this client's session ends.
    async fn create_ephemeral_sequential(&self, parent: &str, payload: &[u8]) -> Result<String>;

    /// Lists the basenames of `parent`'s current children.
    async fn get_children(&self, parent: &str) -> Result<Vec<String>>;

    /// True if `path` currently exists.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Deletes `path` outright. Used for voluntary resignation; involuntary
    /// loss of leadership (session death) is handled by the coordination
    /// service's own ephemeral-node cleanup and never calls this.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Subscribes to changes on `path`. The subscription delivers at most
    /// one [`WatchEvent::Deleted`] (the node is gone for good after that)
    /// but may deliver any number of [`WatchEvent::Changed`] before it.
    async fn watch_data(&self, path: &str) -> Result<WatchSubscription>;
}

/// Parses the sequence suffix off an ephemeral sequential node's basename.
///
/// Basenames are `"{identity}_{sequence}"`, with `sequence` a fixed-width
/// zero-padded decimal counter assigned by the coordination service
/// (mirroring ZooKeeper's own `PERSISTENT_SEQUENTIAL`/`EPHEMERAL_SEQUENTIAL`
/// naming convention). A basename with no parseable suffix sorts last and is
/// logged, since it can only mean a child created outside this protocol.
pub fn sequence_suffix(basename: &str) -> Option<u64> {
    let (_, suffix) = basename.rsplit_once('_')?;
    suffix.parse::<u64>().ok()
}
