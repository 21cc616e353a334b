use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use leader_elector::{CoordinationClient, Result, WatchEvent, WatchSubscription};
use tokio::sync::mpsc;

#[derive(Default)]
struct TreeState {
    nodes: HashMap<String, Vec<u8>>,
    children: HashMap<String, Vec<String>>,
    next_seq: HashMap<String, u64>,
    watchers: HashMap<String, Vec<mpsc::Sender<WatchEvent>>>,
}

/// An in-memory stand-in for a ZooKeeper-like coordination tree: ephemeral
/// sequential children under a parent, existence checks, and single-node
/// watches. `Clone` shares the same tree, so a test can hold one handle for
/// assertions and wrap another for a flaky decorator.
#[derive(Clone, Default)]
pub struct FakeCoordinationClient {
    state: Arc<Mutex<TreeState>>,
}

impl FakeCoordinationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a node as if its session had ended, firing any pending
    /// `Deleted` watchers.
    pub async fn kill(&self, path: &str) {
        let watchers = {
            let mut state = self.state.lock().unwrap();
            state.nodes.remove(path);
            if let Some((parent, basename)) = path.rsplit_once('/') {
                if let Some(list) = state.children.get_mut(parent) {
                    list.retain(|b| b != basename);
                }
            }
            state.watchers.remove(path).unwrap_or_default()
        };
        for tx in watchers {
            let _ = tx.send(WatchEvent::Deleted).await;
        }
    }

    pub async fn children_sorted(&self, parent: &str) -> Vec<String> {
        let mut children = self.state.lock().unwrap().children.get(parent).cloned().unwrap_or_default();
        children.sort_by_key(|b| leader_elector::sequence_suffix(b).unwrap_or(u64::MAX));
        children
    }
}

#[async_trait]
impl CoordinationClient for FakeCoordinationClient {
    async fn create_ephemeral_sequential(&self, parent: &str, payload: &[u8]) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let seq_counter = state.next_seq.entry(parent.to_string()).or_insert(0);
        let assigned = *seq_counter;
        *seq_counter += 1;
        let identity = String::from_utf8_lossy(payload).replace(['/', '_'], "-");
        let basename = format!("{identity}_{assigned:010}");
        let path = format!("{parent}/{basename}");
        state.children.entry(parent.to_string()).or_default().push(basename);
        state.nodes.insert(path.clone(), payload.to_vec());
        Ok(path)
    }

    async fn get_children(&self, parent: &str) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().children.get(parent).cloned().unwrap_or_default())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().nodes.contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.kill(path).await;
        Ok(())
    }

    async fn watch_data(&self, path: &str) -> Result<WatchSubscription> {
        let (tx, rx) = mpsc::channel(8);
        let mut state = self.state.lock().unwrap();
        if !state.nodes.contains_key(path) {
            drop(state);
            let _ = tx.try_send(WatchEvent::Deleted);
            return Ok(WatchSubscription::new(rx));
        }
        state.watchers.entry(path.to_string()).or_default().push(tx);
        Ok(WatchSubscription::new(rx))
    }
}

/// Decorates a [`FakeCoordinationClient`] so that the first `exists` check
/// against `target` reports the node gone (and actually removes it),
/// simulating a predecessor that dies in the window between the children
/// listing and the watch/exists check.
pub struct FlakyExistsOnce {
    inner: FakeCoordinationClient,
    target: String,
    consumed: Mutex<bool>,
}

impl FlakyExistsOnce {
    pub fn new(inner: FakeCoordinationClient, target: String) -> Self {
        Self {
            inner,
            target,
            consumed: Mutex::new(false),
        }
    }
}

#[async_trait]
impl CoordinationClient for FlakyExistsOnce {
    async fn create_ephemeral_sequential(&self, parent: &str, payload: &[u8]) -> Result<String> {
        self.inner.create_ephemeral_sequential(parent, payload).await
    }

    async fn get_children(&self, parent: &str) -> Result<Vec<String>> {
        self.inner.get_children(parent).await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        if path == self.target {
            let mut consumed = self.consumed.lock().unwrap();
            if !*consumed {
                *consumed = true;
                drop(consumed);
                self.inner.kill(path).await;
                return Ok(false);
            }
        }
        self.inner.exists(path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.inner.delete(path).await
    }

    async fn watch_data(&self, path: &str) -> Result<WatchSubscription> {
        self.inner.watch_data(path).await
    }
}
