//! The Directory Validator: decides whether a locally present logged-store
//! directory is safe to reuse, or must be wiped and rebuilt from the
//! changelog.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::Result;
use crate::offset_file;

/// Outcome of validating one store's logged partition directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Directory is valid for reuse; carries the offset to seed
    /// `fileOffset` with.
    Reusable { offset: String },
    /// Directory was absent, invalid, or had to be deleted. Callers should
    /// treat the store as needing a full restore.
    Invalid,
}

/// Pure decision function: a directory is reusable only if the store
/// persists to disk, its `OFFSET` file is present and non-empty, and its
/// age is within the retention window.
///
/// `offset_content` is `None` when the `OFFSET` file is absent; `Some("")`
/// when it exists but is empty.
pub fn is_valid_for_reuse(
    is_persisted_to_disk: bool,
    offset_content: Option<&str>,
    mtime: Option<SystemTime>,
    now: SystemTime,
    retention_ms: i64,
) -> bool {
    if !is_persisted_to_disk {
        return false;
    }
    let Some(content) = offset_content else {
        return false;
    };
    if content.is_empty() {
        return false;
    }
    let Some(mtime) = mtime else {
        return false;
    };
    let age = now
        .duration_since(mtime)
        .unwrap_or(Duration::from_secs(0));
    age < Duration::from_millis(retention_ms.max(0) as u64)
}

/// Validates `dir` for store `store_name` and deletes it if invalid. A
/// directory that was never created is not treated as an error — it's
/// simply `Invalid`, triggering a full restore downstream.
pub async fn validate_and_clean(
    store_name: &str,
    dir: &Path,
    is_persisted_to_disk: bool,
    retention_ms: i64,
) -> Result<ValidationOutcome> {
    let offset_path = crate::paths::offset_file_path(dir);
    let content = offset_file::read_offset(store_name, &offset_path).await?;
    let mtime = offset_file::offset_mtime(store_name, &offset_path).await?;
    let now = SystemTime::now();

    let valid = is_valid_for_reuse(
        is_persisted_to_disk,
        content.as_deref(),
        mtime,
        now,
        retention_ms,
    );

    if valid {
        debug!(store = %store_name, dir = %dir.display(), "logged directory valid for reuse");
        return Ok(ValidationOutcome::Reusable {
            offset: content.expect("valid reuse implies Some offset content"),
        });
    }

    if dir.exists() {
        warn!(store = %store_name, dir = %dir.display(), "logged directory invalid, deleting");
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(crate::error::Error::Io {
                    store: store_name.to_string(),
                    source,
                })
            }
        }
    }
    Ok(ValidationOutcome::Invalid)
}
