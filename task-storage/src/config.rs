//! Configuration keys recognized by the storage manager.

use envconfig::Envconfig;

/// Default tombstone retention window applied when a store doesn't
/// configure its own `changeLogDeleteRetentionMs` (one day).
pub const DEFAULT_CHANGELOG_DELETE_RETENTION_MS: i64 = 86_400_000;

#[derive(Envconfig, Clone, Debug)]
pub struct StorageConfig {
    /// Base directory for ephemeral (non-logged) store partition dirs.
    #[envconfig(default = "./state")]
    pub store_base_dir: String,

    /// Base directory for logged store partition dirs, preserved across
    /// restarts when the Directory Validator finds them reusable.
    #[envconfig(default = "./state")]
    pub logged_store_base_dir: String,

    /// Required: the configured partition count every changelog stream is
    /// validated against before `init` proceeds.
    pub change_log_stream_partitions: u32,
}
