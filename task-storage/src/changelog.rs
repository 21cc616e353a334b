//! The message-system interfaces consumed: a changelog admin (metadata,
//! partition validation) and a changelog consumer (register/start/stop),
//! generalized from `common/kafka`'s `SingleTopicConsumer` from "one Kafka
//! topic" to "one (system, stream, partition)" per the SSP glossary entry.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::restore_iter::RestorationIterator;

/// A stream-partition: the pair `(system, stream, partition)` uniquely
/// identifying one changelog log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ssp {
    pub system: String,
    pub stream: String,
    pub partition: u32,
}

impl Ssp {
    pub fn new(system: impl Into<String>, stream: impl Into<String>, partition: u32) -> Self {
        Self {
            system: system.into(),
            stream: stream.into(),
            partition,
        }
    }
}

/// Oldest/newest offsets for one partition of a changelog stream. `None`
/// means the changelog is empty at that end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub oldest_offset: Option<i64>,
    pub newest_offset: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct StreamMetadata {
    pub partitions: HashMap<u32, PartitionMetadata>,
}

/// The system admin interface consumed. One implementation typically backs
/// every changelog system configured for a task; the manager looks one up
/// per `(system, stream)` pair and treats an unknown system as fatal
/// (`Error::MissingSystemAdmin`).
#[async_trait]
pub trait ChangelogAdmin: Send + Sync {
    /// Fails with `Error::InvalidChangelogPartitioning` if the stream's
    /// actual partition count diverges from `expected_partitions`.
    async fn validate_changelog_stream(&self, stream: &str, expected_partitions: u32) -> Result<()>;

    /// Batched metadata fetch for every stream named.
    async fn get_system_stream_metadata(
        &self,
        streams: &[String],
    ) -> Result<HashMap<String, StreamMetadata>>;

    /// The optional extended capability: a single-SSP newest-offset call.
    /// Preferred over `get_system_stream_metadata` during checkpointing
    /// when available. The retry count on this path and on the fallback
    /// metadata path are intentionally different; see `checkpoint.rs`.
    async fn get_newest_offset(&self, _ssp: &Ssp, _retries: u32) -> Result<Option<Option<i64>>> {
        Ok(None)
    }
}

/// The consumer interface consumed: register a set of SSPs at chosen
/// starting offsets, start polling, and hand back a restoration iterator
/// per SSP once started.
#[async_trait]
pub trait ChangelogConsumer: Send + Sync {
    fn register(&mut self, ssp: Ssp, starting_offset: i64);

    async fn start(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    /// Only valid after `start`; panics (a programmer error, not a runtime
    /// one) if called for an SSP that was never registered.
    fn restoration_iterator(&self, ssp: &Ssp) -> Box<dyn RestorationIterator>;
}

/// Validates every changelog's partition count, then fetches metadata for
/// all of them in one batch and extracts this partition's oldest offset. A
/// stream whose metadata is missing partition information for `partition`
/// is silently dropped from the result map — that is not an error, it just
/// means `start_consumers` will treat it as "no known offset".
pub async fn gather_oldest_offsets(
    admin: &dyn ChangelogAdmin,
    streams: &[String],
    expected_partitions: u32,
    partition: u32,
) -> Result<HashMap<String, Option<i64>>> {
    for stream in streams {
        admin
            .validate_changelog_stream(stream, expected_partitions)
            .await?;
    }

    let metadata = admin.get_system_stream_metadata(streams).await?;

    let mut oldest = HashMap::new();
    for stream in streams {
        let Some(stream_meta) = metadata.get(stream) else {
            debug!(stream = %stream, "no metadata returned for changelog stream, dropping");
            continue;
        };
        let Some(part_meta) = stream_meta.partitions.get(&partition) else {
            debug!(stream = %stream, partition, "no partition metadata for this partition, dropping");
            continue;
        };
        oldest.insert(stream.clone(), part_meta.oldest_offset);
    }
    Ok(oldest)
}

pub(crate) fn missing_system_admin(system: &str) -> Error {
    Error::MissingSystemAdmin {
        system: system.to_string(),
    }
}
