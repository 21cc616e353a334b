//! The Leader Elector: rank-by-sequence election over ephemeral sequential
//! children, with each non-leader watching only its immediate predecessor,
//! ZooKeeper-style. A cloneable handle exposes `try_become_leader`,
//! `resign_leadership`, and `is_leader` for a caller to poll.
//!
//! Predecessor-vanished races are handled by an explicit bounded retry
//! loop, with a generous iteration cap standing in for "bounded in
//! practice by the finite number of peers" rather than by unbounded
//! recursion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordination::{sequence_suffix, CoordinationClient, WatchEvent, WatchSubscription};
use crate::error::{Error, Result};

/// A defensive ceiling on predecessor-vanished retries within one
/// `try_become_leader` call. The election terminates well before this in
/// any real deployment; it exists only to turn a pathological flapping
/// predecessor into an error instead of an infinite loop.
const MAX_ELECTION_ATTEMPTS: usize = 64;

struct ElectorState {
    participant_path: Option<String>,
    watched_predecessor: Option<String>,
    watch_task: Option<JoinHandle<()>>,
}

struct Inner {
    client: Arc<dyn CoordinationClient>,
    processors_path: String,
    hostname: String,
    is_leader: AtomicBool,
    state: Mutex<ElectorState>,
}

/// A handle to one process's participation in the election over
/// `processors_path`. Cheap to clone; clones share the same registration
/// and leadership state.
#[derive(Clone)]
pub struct LeaderElector {
    inner: Arc<Inner>,
}

impl LeaderElector {
    /// `hostname` identifies this process in the election tree; it is
    /// supplied by the caller rather than resolved here, since acquiring it
    /// is an environment concern outside this crate's scope. An empty
    /// hostname is rejected immediately.
    pub fn new(
        client: Arc<dyn CoordinationClient>,
        processors_path: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Result<Self> {
        let hostname = hostname.into();
        if hostname.is_empty() {
            return Err(Error::UnknownHost);
        }
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                processors_path: processors_path.into(),
                hostname,
                is_leader: AtomicBool::new(false),
                state: Mutex::new(ElectorState {
                    participant_path: None,
                    watched_predecessor: None,
                    watch_task: None,
                }),
            }),
        })
    }

    /// True if this process currently believes itself to be the leader.
    /// Reflects the outcome of the last `try_become_leader` call, not a
    /// live re-check.
    pub fn is_leader(&self) -> bool {
        self.inner.is_leader.load(Ordering::SeqCst)
    }

    /// Runs the Participant Registrar (idempotent: a cached participant
    /// path is reused) followed by the Election Core. Returns `Ok(true)`
    /// if this process is now the leader, `Ok(false)` if it is watching a
    /// predecessor. On `Err(Error::ReconnectNeeded)` the caller's session
    /// has been invalidated and should re-register from scratch via a
    /// fresh `LeaderElector`.
    pub async fn try_become_leader(&self) -> Result<bool> {
        self.ensure_registered().await?;

        for attempt in 0..MAX_ELECTION_ATTEMPTS {
            let own_basename = self.own_basename()?;
            let mut children = self.inner.client.get_children(&self.inner.processors_path).await?;
            children.sort_by_key(|b| sequence_suffix(b).unwrap_or(u64::MAX));

            let Some(position) = children.iter().position(|b| *b == own_basename) else {
                warn!(host = %self.inner.hostname, "participant node missing from children, reconnect required");
                self.inner.state.lock().unwrap().participant_path = None;
                return Err(Error::ReconnectNeeded);
            };

            if position == 0 {
                self.set_leader(true);
                info!(host = %self.inner.hostname, "elected leader");
                return Ok(true);
            }

            self.set_leader(false);
            let predecessor_basename = &children[position - 1];
            let predecessor_path = format!("{}/{}", self.inner.processors_path, predecessor_basename);

            self.watch_predecessor(&predecessor_path).await?;

            if self.inner.client.exists(&predecessor_path).await? {
                debug!(host = %self.inner.hostname, predecessor = %predecessor_path, "watching predecessor");
                return Ok(false);
            }

            // The predecessor vanished between the children listing and the
            // exists/subscribe check. Back off briefly so a flood of
            // simultaneous re-checks doesn't thunder on the coordination
            // service, then re-run the Election Core.
            let jitter = rand::thread_rng().gen_range(0..1000u64);
            debug!(attempt, jitter_ms = jitter, "predecessor vanished mid-check, retrying");
            tokio::time::sleep(Duration::from_millis(jitter)).await;
        }

        Err(Error::ReconnectNeeded)
    }

    /// Voluntarily gives up leadership (or a pending candidacy): deletes
    /// this process's participant node and stops any active predecessor
    /// watch. A fresh `try_become_leader` call re-registers from scratch.
    pub async fn resign_leadership(&self) -> Result<()> {
        let participant_path = self.inner.state.lock().unwrap().participant_path.clone();
        if let Some(path) = participant_path {
            self.inner.client.delete(&path).await?;
        }
        self.set_leader(false);
        let mut state = self.inner.state.lock().unwrap();
        state.participant_path = None;
        state.watched_predecessor = None;
        if let Some(task) = state.watch_task.take() {
            task.abort();
        }
        Ok(())
    }

    async fn ensure_registered(&self) -> Result<()> {
        let already_registered = self.inner.state.lock().unwrap().participant_path.is_some();
        if already_registered {
            return Ok(());
        }
        let path = self
            .inner
            .client
            .create_ephemeral_sequential(&self.inner.processors_path, self.inner.hostname.as_bytes())
            .await?;
        self.inner.state.lock().unwrap().participant_path = Some(path);
        Ok(())
    }

    fn own_basename(&self) -> Result<String> {
        let participant_path = self
            .inner
            .state
            .lock()
            .unwrap()
            .participant_path
            .clone()
            .ok_or(Error::ReconnectNeeded)?;
        Ok(participant_path
            .rsplit('/')
            .next()
            .unwrap_or(&participant_path)
            .to_string())
    }

    fn set_leader(&self, leader: bool) {
        self.inner.is_leader.store(leader, Ordering::SeqCst);
    }

    /// Watch Handler: (re)subscribes to `predecessor_path` only if it
    /// differs from what's currently watched, detaching the old watch task
    /// first.
    async fn watch_predecessor(&self, predecessor_path: &str) -> Result<()> {
        let needs_rewire = {
            let state = self.inner.state.lock().unwrap();
            state.watched_predecessor.as_deref() != Some(predecessor_path)
        };
        if !needs_rewire {
            return Ok(());
        }

        let subscription = self.inner.client.watch_data(predecessor_path).await?;

        let mut state = self.inner.state.lock().unwrap();
        if let Some(task) = state.watch_task.take() {
            task.abort();
        }
        state.watched_predecessor = Some(predecessor_path.to_string());
        drop(state);

        let elector = self.clone();
        let predecessor_path = predecessor_path.to_string();
        let handle = tokio::spawn(async move {
            watch_loop(elector, predecessor_path, subscription).await;
        });
        self.inner.state.lock().unwrap().watch_task = Some(handle);
        Ok(())
    }
}

/// Runs for the lifetime of one predecessor watch: a deleted predecessor
/// re-enters the Election Core; a data change is merely logged, since the
/// election only cares about existence.
async fn watch_loop(elector: LeaderElector, predecessor_path: String, mut subscription: WatchSubscription) {
    while let Some(event) = subscription.recv().await {
        match event {
            WatchEvent::Deleted => {
                info!(predecessor = %predecessor_path, "predecessor deleted, re-running election");
                if let Err(err) = elector.try_become_leader().await {
                    warn!(error = %err, "re-election after predecessor deletion failed");
                }
                return;
            }
            WatchEvent::Changed => {
                debug!(path = %predecessor_path, "predecessor data changed, no action taken");
            }
        }
    }
}
