//! Task Storage Manager: keeps a stateful task's local on-disk state stores
//! consistent with their per-store durable changelog streams.
//!
//! Storage engines, the changelog message system, configuration loading,
//! and the logging subsystem are external collaborators, modeled here as
//! traits (`engine::StorageEngine`, `changelog::ChangelogAdmin`,
//! `changelog::ChangelogConsumer`) rather than implemented.

pub mod changelog;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod manager;
pub mod offset_file;
pub mod paths;
pub mod restore_iter;
pub mod validator;

pub use changelog::{ChangelogAdmin, ChangelogConsumer, Ssp};
pub use config::StorageConfig;
pub use engine::{ChangelogDescriptor, StorageEngine, StoreProperties};
pub use error::{Error, Result};
pub use manager::{StoreDescriptor, TaskStorageManager};
pub use restore_iter::{Record, RestorationIterator};
