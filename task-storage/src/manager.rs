//! The Manager Facade: `init`, `flush`, `stop`, and the per-store accessor.
//! `init` runs its six phases strictly in order and aborts on the first
//! error; `flush`/`stop` are never interleaved by the caller.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::changelog::{gather_oldest_offsets, missing_system_admin, ChangelogAdmin, ChangelogConsumer, Ssp};
use crate::checkpoint::{self, CheckpointTarget};
use crate::config::StorageConfig;
use crate::engine::{ChangelogDescriptor, StorageEngine};
use crate::error::{Error, Result};
use crate::paths;
use crate::validator::{self, ValidationOutcome};

/// One store as injected at construction: its engine handle and, if it has
/// one, its changelog association.
pub struct StoreDescriptor {
    pub name: String,
    pub engine: Arc<dyn StorageEngine>,
    pub changelog: Option<ChangelogDescriptor>,
}

struct StoreEntry {
    name: String,
    engine: Arc<dyn StorageEngine>,
    changelog: Option<ChangelogDescriptor>,
    is_logged_store: bool,
    is_persisted_to_disk: bool,
}

impl StoreEntry {
    fn ssp(&self, partition: u32) -> Option<Ssp> {
        self.changelog
            .as_ref()
            .map(|c| Ssp::new(c.system.clone(), c.stream.clone(), partition))
    }

    fn non_logged_dir(&self, cfg: &StorageConfig, task_name: &str) -> PathBuf {
        paths::non_logged_partition_dir(
            std::path::Path::new(&cfg.store_base_dir),
            &self.name,
            task_name,
        )
    }

    fn logged_dir(&self, cfg: &StorageConfig, task_name: &str) -> PathBuf {
        paths::logged_partition_dir(
            std::path::Path::new(&cfg.logged_store_base_dir),
            &self.name,
            task_name,
        )
    }
}

/// The Storage Manager for one partition of one stateful task.
pub struct TaskStorageManager {
    task_name: String,
    partition: u32,
    config: StorageConfig,
    // `IndexMap` so `flush`/`stop` drive every engine in declaration
    // order, not `HashMap`'s unspecified iteration order.
    stores: IndexMap<String, StoreEntry>,
    admins: HashMap<String, Arc<dyn ChangelogAdmin>>,
    consumers: HashMap<String, Box<dyn ChangelogConsumer>>,
    to_restore: HashSet<String>,
    file_offset: HashMap<Ssp, i64>,
}

impl TaskStorageManager {
    pub fn new(
        task_name: impl Into<String>,
        partition: u32,
        config: StorageConfig,
        stores: Vec<StoreDescriptor>,
        admins: HashMap<String, Arc<dyn ChangelogAdmin>>,
        consumers: HashMap<String, Box<dyn ChangelogConsumer>>,
    ) -> Self {
        let mut to_restore = HashSet::new();
        let mut entries = IndexMap::new();
        for store in stores {
            let properties = store.engine.properties();
            if properties.is_logged_store {
                to_restore.insert(store.name.clone());
            }
            entries.insert(
                store.name.clone(),
                StoreEntry {
                    name: store.name,
                    engine: store.engine,
                    changelog: store.changelog,
                    is_logged_store: properties.is_logged_store,
                    is_persisted_to_disk: properties.is_persisted_to_disk,
                },
            );
        }

        Self {
            task_name: task_name.into(),
            partition,
            config,
            stores: entries,
            admins,
            consumers,
            to_restore,
            file_offset: HashMap::new(),
        }
    }

    /// Per-store accessor: hands back the store's engine handle by name, for
    /// the task runtime to dispatch reads/writes against after `init`.
    pub fn get_store(&self, name: &str) -> Option<Arc<dyn StorageEngine>> {
        self.stores.get(name).map(|e| e.engine.clone())
    }

    /// Runs the full startup sequence: clean, setup, validate changelogs,
    /// start consumers, restore, stop consumers. Aborts on the first error;
    /// no partial rollback is attempted.
    pub async fn init(&mut self) -> Result<()> {
        self.clean_base_dirs().await?;
        self.setup_base_dirs().await?;
        let oldest_offsets = self.validate_changelog_streams().await?;
        self.start_consumers(&oldest_offsets).await?;
        self.restore_stores().await?;
        self.stop_consumers().await?;
        Ok(())
    }

    /// Phase 1: delete every non-logged dir unconditionally; validate each
    /// logged dir, deleting it if invalid and seeding `file_offset`
    /// otherwise.
    async fn clean_base_dirs(&mut self) -> Result<()> {
        let names: Vec<String> = self.stores.keys().cloned().collect();
        for name in names {
            let (non_logged_dir, logged_dir, is_logged_store, is_persisted, retention_ms, ssp) = {
                let entry = &self.stores[&name];
                (
                    entry.non_logged_dir(&self.config, &self.task_name),
                    entry.logged_dir(&self.config, &self.task_name),
                    entry.is_logged_store,
                    entry.is_persisted_to_disk,
                    entry.changelog.as_ref().map(|c| c.delete_retention_ms),
                    entry.ssp(self.partition),
                )
            };

            match tokio::fs::remove_dir_all(&non_logged_dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(Error::Io {
                        store: name.clone(),
                        source,
                    })
                }
            }

            if is_logged_store {
                let retention_ms = retention_ms.unwrap_or(crate::config::DEFAULT_CHANGELOG_DELETE_RETENTION_MS);
                let outcome =
                    validator::validate_and_clean(&name, &logged_dir, is_persisted, retention_ms).await?;
                if let ValidationOutcome::Reusable { offset } = outcome {
                    if let Some(ssp) = ssp {
                        match offset.parse::<i64>() {
                            Ok(parsed) => {
                                debug!(store = %name, offset = parsed, "seeded file offset from OFFSET file");
                                self.file_offset.insert(ssp, parsed);
                            }
                            Err(_) => {
                                warn!(store = %name, offset = %offset, "OFFSET file content is not a valid integer, ignoring");
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Phase 2: create each store's partition dir if absent. Non-logged
    /// dirs are created unconditionally; logged dirs are gated by
    /// `exists()` first. The asymmetry is intentional and preserved as-is
    /// rather than unified into one code path.
    async fn setup_base_dirs(&self) -> Result<()> {
        for entry in self.stores.values() {
            let non_logged_dir = entry.non_logged_dir(&self.config, &self.task_name);
            tokio::fs::create_dir_all(&non_logged_dir)
                .await
                .map_err(|source| Error::Io {
                    store: entry.name.clone(),
                    source,
                })?;

            if entry.is_logged_store {
                let logged_dir = entry.logged_dir(&self.config, &self.task_name);
                if !logged_dir.exists() {
                    tokio::fs::create_dir_all(&logged_dir)
                        .await
                        .map_err(|source| Error::Io {
                            store: entry.name.clone(),
                            source,
                        })?;
                }
            }
        }
        Ok(())
    }

    /// Phase 3: validate every changelog stream's partition count and
    /// gather oldest offsets for this partition, one admin-batch per
    /// system.
    async fn validate_changelog_streams(&self) -> Result<HashMap<String, Option<i64>>> {
        let mut streams_by_system: HashMap<String, Vec<String>> = HashMap::new();
        for entry in self.stores.values() {
            if let Some(changelog) = &entry.changelog {
                streams_by_system
                    .entry(changelog.system.clone())
                    .or_default()
                    .push(changelog.stream.clone());
            }
        }

        let mut oldest_offsets = HashMap::new();
        for (system, streams) in streams_by_system {
            let admin = self
                .admins
                .get(&system)
                .ok_or_else(|| missing_system_admin(&system))?;
            let gathered = gather_oldest_offsets(
                admin.as_ref(),
                &streams,
                self.config.change_log_stream_partitions,
                self.partition,
            )
            .await?;
            oldest_offsets.extend(gathered);
        }
        Ok(oldest_offsets)
    }

    /// Phase 4: register each changelogged store's consumer at the chosen
    /// starting offset and start every consumer. A store whose resolved
    /// offset is null (empty changelog) is dropped from `to_restore` and
    /// never registered — no default offset is substituted.
    async fn start_consumers(&mut self, oldest_offsets: &HashMap<String, Option<i64>>) -> Result<()> {
        let names: Vec<String> = self.stores.keys().cloned().collect();
        for name in names {
            let (changelog, ssp) = {
                let entry = &self.stores[&name];
                (entry.changelog.clone(), entry.ssp(self.partition))
            };
            let Some(changelog) = changelog else { continue };
            let Some(ssp) = ssp else { continue };

            let starting_offset = match self.file_offset.get(&ssp) {
                Some(offset) => Some(*offset),
                None => match oldest_offsets.get(&changelog.stream) {
                    Some(offset) => *offset,
                    None => {
                        return Err(Error::MissingChangelogOffset {
                            store: name.clone(),
                            system: changelog.system.clone(),
                            stream: changelog.stream.clone(),
                            partition: self.partition,
                        })
                    }
                },
            };

            match starting_offset {
                None => {
                    debug!(store = %name, "changelog empty, skipping restore");
                    self.to_restore.remove(&name);
                }
                Some(offset) => {
                    let consumer = self.consumers.get_mut(&changelog.system).ok_or_else(|| {
                        Error::MissingConsumer {
                            system: changelog.system.clone(),
                        }
                    })?;
                    consumer.register(ssp, offset);
                }
            }
        }

        for consumer in self.consumers.values_mut() {
            consumer.start().await?;
        }
        Ok(())
    }

    /// Phase 5: hand each remaining store's restoration iterator to its
    /// engine and block until the engine reports the iterator drained.
    async fn restore_stores(&self) -> Result<()> {
        for name in &self.to_restore {
            let entry = &self.stores[name];
            let Some(changelog) = &entry.changelog else { continue };
            let Some(ssp) = entry.ssp(self.partition) else { continue };
            let Some(consumer) = self.consumers.get(&changelog.system) else {
                continue;
            };
            let iterator = consumer.restoration_iterator(&ssp);
            info!(store = %name, "restoring store from changelog");
            entry
                .engine
                .restore(iterator)
                .await
                .map_err(|source| Error::Engine {
                    store: name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Phase 6.
    async fn stop_consumers(&mut self) -> Result<()> {
        for consumer in self.consumers.values_mut() {
            consumer.stop().await?;
        }
        Ok(())
    }

    /// Flushes every engine in declaration order, then checkpoints offsets.
    pub async fn flush(&self) -> Result<()> {
        for entry in self.stores.values() {
            entry
                .engine
                .flush()
                .await
                .map_err(|source| Error::Engine {
                    store: entry.name.clone(),
                    source,
                })?;
        }
        self.flush_changelog_offset_files().await;
        Ok(())
    }

    /// Stops every engine, then checkpoints offsets.
    pub async fn stop(&self) -> Result<()> {
        for entry in self.stores.values() {
            entry
                .engine
                .stop()
                .await
                .map_err(|source| Error::Engine {
                    store: entry.name.clone(),
                    source,
                })?;
        }
        self.flush_changelog_offset_files().await;
        Ok(())
    }

    async fn flush_changelog_offset_files(&self) {
        let targets: Vec<CheckpointTarget> = self
            .stores
            .values()
            .filter(|e| e.is_logged_store && e.is_persisted_to_disk)
            .filter_map(|e| {
                let ssp = e.ssp(self.partition)?;
                let logged_dir = e.logged_dir(&self.config, &self.task_name);
                Some(CheckpointTarget {
                    store_name: e.name.clone(),
                    ssp,
                    offset_path: paths::offset_file_path(&logged_dir),
                })
            })
            .collect();

        let admins = &self.admins;
        checkpoint::flush_changelog_offset_files(&targets, |system| admins.get(system).cloned())
            .await;
    }
}
