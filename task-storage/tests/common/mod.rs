use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use task_storage::{
    ChangelogAdmin, ChangelogConsumer, Record, RestorationIterator, Ssp, StorageEngine,
    StoreProperties,
};

pub struct FakeEngine {
    properties: StoreProperties,
    pub restored_offsets: Mutex<Vec<i64>>,
    pub flush_count: Mutex<u32>,
    pub stop_count: Mutex<u32>,
}

impl FakeEngine {
    pub fn new(is_logged_store: bool, is_persisted_to_disk: bool) -> Arc<Self> {
        Arc::new(Self {
            properties: StoreProperties {
                is_logged_store,
                is_persisted_to_disk,
            },
            restored_offsets: Mutex::new(Vec::new()),
            flush_count: Mutex::new(0),
            stop_count: Mutex::new(0),
        })
    }
}

#[async_trait]
impl StorageEngine for FakeEngine {
    fn properties(&self) -> StoreProperties {
        self.properties
    }

    async fn restore(
        &self,
        mut iterator: Box<dyn RestorationIterator>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        while let Some(record) = iterator.next().await {
            self.restored_offsets.lock().unwrap().push(record.offset);
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        *self.flush_count.lock().unwrap() += 1;
        Ok(())
    }

    async fn stop(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        *self.stop_count.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Default)]
struct AdminInner {
    partitions: HashMap<String, HashMap<u32, (Option<i64>, Option<i64>)>>,
    fail_validate: bool,
    fail_newest: bool,
}

#[derive(Clone, Default)]
pub struct FakeAdmin {
    inner: Arc<Mutex<AdminInner>>,
}

impl FakeAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the (oldest, newest) offsets for `stream`'s partition 0.
    pub fn with_partition_0(self, stream: &str, oldest: Option<i64>, newest: Option<i64>) -> Self {
        self.inner
            .lock()
            .unwrap()
            .partitions
            .entry(stream.to_string())
            .or_default()
            .insert(0, (oldest, newest));
        self
    }

    pub fn failing_newest_offset(self) -> Self {
        self.inner.lock().unwrap().fail_newest = true;
        self
    }
}

#[async_trait]
impl ChangelogAdmin for FakeAdmin {
    async fn validate_changelog_stream(
        &self,
        _stream: &str,
        _expected_partitions: u32,
    ) -> task_storage::Result<()> {
        if self.inner.lock().unwrap().fail_validate {
            return Err(task_storage::Error::InvalidChangelogPartitioning {
                stream: _stream.to_string(),
                expected: _expected_partitions,
                actual: _expected_partitions + 1,
            });
        }
        Ok(())
    }

    async fn get_system_stream_metadata(
        &self,
        streams: &[String],
    ) -> task_storage::Result<HashMap<String, task_storage::changelog::StreamMetadata>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_newest {
            return Err(task_storage::Error::Changelog("metadata fetch failed".into()));
        }
        let mut out = HashMap::new();
        for stream in streams {
            let mut partitions = HashMap::new();
            if let Some(parts) = inner.partitions.get(stream) {
                for (p, (oldest, newest)) in parts {
                    partitions.insert(
                        *p,
                        task_storage::changelog::PartitionMetadata {
                            oldest_offset: *oldest,
                            newest_offset: *newest,
                        },
                    );
                }
            }
            out.insert(
                stream.clone(),
                task_storage::changelog::StreamMetadata { partitions },
            );
        }
        Ok(out)
    }
}

struct ConsumerInner {
    registered: HashMap<Ssp, i64>,
    started: bool,
    stopped: bool,
    tails: HashMap<Ssp, Vec<Record>>,
}

/// A fake changelog consumer. `Clone` shares the same inner state, so a test
/// can keep a handle for assertions while handing a `Box<dyn ChangelogConsumer>`
/// to the manager.
#[derive(Clone)]
pub struct FakeConsumer {
    inner: Arc<Mutex<ConsumerInner>>,
}

impl FakeConsumer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ConsumerInner {
                registered: HashMap::new(),
                started: false,
                stopped: false,
                tails: HashMap::new(),
            })),
        }
    }

    pub fn with_tail(self, ssp: Ssp, records: Vec<Record>) -> Self {
        self.inner.lock().unwrap().tails.insert(ssp, records);
        self
    }

    pub fn registered_offset(&self, ssp: &Ssp) -> Option<i64> {
        self.inner.lock().unwrap().registered.get(ssp).copied()
    }

    pub fn was_started(&self) -> bool {
        self.inner.lock().unwrap().started
    }

    pub fn was_stopped(&self) -> bool {
        self.inner.lock().unwrap().stopped
    }
}

#[async_trait]
impl ChangelogConsumer for FakeConsumer {
    fn register(&mut self, ssp: Ssp, starting_offset: i64) {
        self.inner
            .lock()
            .unwrap()
            .registered
            .insert(ssp, starting_offset);
    }

    async fn start(&mut self) -> task_storage::Result<()> {
        self.inner.lock().unwrap().started = true;
        Ok(())
    }

    async fn stop(&mut self) -> task_storage::Result<()> {
        self.inner.lock().unwrap().stopped = true;
        Ok(())
    }

    fn restoration_iterator(&self, ssp: &Ssp) -> Box<dyn RestorationIterator> {
        let records = self
            .inner
            .lock()
            .unwrap()
            .tails
            .get(ssp)
            .cloned()
            .unwrap_or_default();
        Box::new(task_storage::restore_iter::VecRestorationIterator::new(records))
    }
}

pub fn record(offset: i64) -> Record {
    Record {
        offset,
        key: vec![],
        value: offset.to_le_bytes().to_vec(),
    }
}
