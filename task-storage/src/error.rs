//! Error kinds for the storage manager, per the error-handling policy table:
//! most are fatal and abort `init`/`flush`; `CheckpointFailed` is the one
//! kind the caller never sees, since the checkpointer logs and swallows it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no system admin registered for system '{system}'")]
    MissingSystemAdmin { system: String },

    #[error("no consumer registered for system '{system}'")]
    MissingConsumer { system: String },

    #[error("no changelog offset available for store '{store}' (system={system}, stream={stream}, partition={partition})")]
    MissingChangelogOffset {
        store: String,
        system: String,
        stream: String,
        partition: u32,
    },

    #[error("changelog stream '{stream}' has {actual} partitions, expected {expected}")]
    InvalidChangelogPartitioning {
        stream: String,
        expected: u32,
        actual: u32,
    },

    #[error("io error on store '{store}': {source}")]
    Io {
        store: String,
        #[source]
        source: std::io::Error,
    },

    #[error("changelog system error: {0}")]
    Changelog(String),

    #[error("storage engine error for store '{store}': {source}")]
    Engine {
        store: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
