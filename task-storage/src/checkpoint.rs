//! The Offset Checkpointer: after a flush, writes the newest changelog
//! offset into each logged+persisted store's `OFFSET` file, or deletes it
//! if the changelog turns out to be empty.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::changelog::{ChangelogAdmin, Ssp};
use crate::offset_file;

/// One store's checkpoint target: where its `OFFSET` file lives and which
/// changelog partition to read the newest offset from.
pub struct CheckpointTarget {
    pub store_name: String,
    pub ssp: Ssp,
    pub offset_path: PathBuf,
}

/// Bounded retry count for the extended admin's single-SSP newest-offset
/// call. The fallback (full-metadata) path uses none — this asymmetry is
/// intentional and preserved as-is, not "fixed" to be symmetric.
const NEWEST_OFFSET_RETRIES: u32 = 3;

/// Runs the checkpointer over every target. A failure on one store is
/// logged and does not stop the others — a failed checkpoint merely forces
/// a longer restore on the next `init`.
pub async fn flush_changelog_offset_files(
    targets: &[CheckpointTarget],
    admin_for_system: impl Fn(&str) -> Option<Arc<dyn ChangelogAdmin>>,
) {
    for target in targets {
        if let Err(e) = checkpoint_one(target, &admin_for_system).await {
            error!(
                store = %target.store_name,
                error = %e,
                "checkpoint failed, leaving existing OFFSET file untouched; next init will restore more"
            );
        }
    }
}

async fn checkpoint_one(
    target: &CheckpointTarget,
    admin_for_system: &impl Fn(&str) -> Option<Arc<dyn ChangelogAdmin>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let admin = admin_for_system(&target.ssp.system).ok_or_else(|| {
        format!(
            "no system admin registered for system '{}'",
            target.ssp.system
        )
    })?;

    let newest = match admin
        .get_newest_offset(&target.ssp, NEWEST_OFFSET_RETRIES)
        .await?
    {
        Some(offset) => offset,
        None => fallback_newest_offset(admin.as_ref(), &target.ssp).await?,
    };

    match newest {
        Some(offset) => {
            offset_file::write_offset(&target.store_name, &target.offset_path, &offset.to_string())
                .await?;
            info!(store = %target.store_name, offset, "checkpointed changelog offset");
        }
        None => {
            offset_file::delete_offset(&target.store_name, &target.offset_path).await?;
            info!(store = %target.store_name, "changelog empty, removed OFFSET file");
        }
    }
    Ok(())
}

async fn fallback_newest_offset(
    admin: &dyn ChangelogAdmin,
    ssp: &Ssp,
) -> Result<Option<i64>, Box<dyn std::error::Error + Send + Sync>> {
    let metadata = admin
        .get_system_stream_metadata(std::slice::from_ref(&ssp.stream))
        .await?;
    let offset = metadata
        .get(&ssp.stream)
        .and_then(|stream_meta| stream_meta.partitions.get(&ssp.partition))
        .and_then(|part_meta| part_meta.newest_offset);
    Ok(offset)
}
