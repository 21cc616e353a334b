//! Path Layout: pure functions mapping (base dir, store name, task name) to
//! a partition directory. No I/O happens here.

use std::path::{Path, PathBuf};

/// Sanitizes a task name for use as a path component.
///
/// Only replaces ASCII space with underscore. Other filesystem-unsafe
/// characters (`/`, `\0`, …) are passed through unchanged. This is a known
/// gap, intentionally not broadened into a general sanitizer here.
pub fn sanitize_task_name(task_name: &str) -> String {
    task_name.replace(' ', "_")
}

/// The ephemeral (non-logged) partition directory for a store, deleted
/// unconditionally on every `init`.
pub fn non_logged_partition_dir(store_base_dir: &Path, store_name: &str, task_name: &str) -> PathBuf {
    store_base_dir
        .join(store_name)
        .join(sanitize_task_name(task_name))
}

/// The logged partition directory for a store, preserved across runs when
/// the Directory Validator finds it reusable.
pub fn logged_partition_dir(logged_store_base_dir: &Path, store_name: &str, task_name: &str) -> PathBuf {
    logged_store_base_dir
        .join(store_name)
        .join(sanitize_task_name(task_name))
}

/// Path to the `OFFSET` file inside a logged partition directory.
pub fn offset_file_path(logged_partition_dir: &Path) -> PathBuf {
    logged_partition_dir.join("OFFSET")
}
