//! Offset File I/O: atomic read/write/delete of the single `OFFSET` file
//! inside a logged store's partition directory.

use std::path::Path;

use crate::error::{Error, Result};

/// Reads the offset file's content, if present. Returns `Ok(None)` if the
/// file doesn't exist; an empty file is returned as `Some(String::new())`
/// so callers (the Directory Validator) can distinguish "absent" from
/// "present but empty".
pub async fn read_offset(store: &str, path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Io {
            store: store.to_string(),
            source,
        }),
    }
}

/// Returns the offset file's last-modified time, if it exists.
pub async fn offset_mtime(store: &str, path: &Path) -> Result<Option<std::time::SystemTime>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.modified().map_err(|source| Error::Io {
            store: store.to_string(),
            source,
        })?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Io {
            store: store.to_string(),
            source,
        }),
    }
}

/// Atomically writes `offset` to `path`: write to a sibling temp file, then
/// rename over the destination, so a concurrent reader never observes a
/// truncated file.
pub async fn write_offset(store: &str, path: &Path, offset: &str) -> Result<()> {
    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, offset.as_bytes())
        .await
        .map_err(|source| Error::Io {
            store: store.to_string(),
            source,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|source| Error::Io {
            store: store.to_string(),
            source,
        })?;
    Ok(())
}

/// Deletes the offset file if it exists; absence is not an error.
pub async fn delete_offset(store: &str, path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::Io {
            store: store.to_string(),
            source,
        }),
    }
}

fn tmp_sibling(path: &Path) -> std::path::PathBuf {
    let file_name = path
        .file_name()
        .map(|n| format!(".{}.tmp", n.to_string_lossy()))
        .unwrap_or_else(|| ".OFFSET.tmp".to_string());
    path.with_file_name(file_name)
}
