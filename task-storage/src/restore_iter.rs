//! The consumer-backed restoration iterator: a lazy, finite,
//! single-consumer sequence over records for exactly one SSP. Modeled as a
//! pull interface rather than a full `Stream`, since the only thing
//! engines do with it is call `next` in a loop until it returns `None`.

use async_trait::async_trait;

use crate::changelog::Ssp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub offset: i64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// `next` blocks (awaits) until either a record is available or the
/// iterator has reached the watermark known at the time restoration began,
/// in which case it returns `None` exactly once and every subsequent call
/// also returns `None`.
#[async_trait]
pub trait RestorationIterator: Send {
    async fn next(&mut self) -> Option<Record>;
}

/// A restoration iterator backed by a running consumer's channel. The
/// consumer task pushes records as they arrive and closes the channel once
/// its catch-up watermark (the end offset captured at registration time)
/// is reached.
pub struct ChannelRestorationIterator {
    ssp: Ssp,
    rx: tokio::sync::mpsc::Receiver<Record>,
    exhausted: bool,
}

impl ChannelRestorationIterator {
    pub fn new(ssp: Ssp, rx: tokio::sync::mpsc::Receiver<Record>) -> Self {
        Self {
            ssp,
            rx,
            exhausted: false,
        }
    }

    pub fn ssp(&self) -> &Ssp {
        &self.ssp
    }
}

#[async_trait]
impl RestorationIterator for ChannelRestorationIterator {
    async fn next(&mut self) -> Option<Record> {
        if self.exhausted {
            return None;
        }
        match self.rx.recv().await {
            Some(record) => Some(record),
            None => {
                self.exhausted = true;
                None
            }
        }
    }
}

/// A restoration iterator over a fixed, already-known sequence of records.
/// Useful for tests and for engines that want to replay a fully-buffered
/// tail without spinning up a real consumer.
pub struct VecRestorationIterator {
    records: std::vec::IntoIter<Record>,
}

impl VecRestorationIterator {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

#[async_trait]
impl RestorationIterator for VecRestorationIterator {
    async fn next(&mut self) -> Option<Record> {
        self.records.next()
    }
}
