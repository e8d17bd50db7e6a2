//! Local file writes for downloads

use std::path::{Path, PathBuf};

use bucketsync_core::domain::PARTIAL_DOWNLOAD_SUFFIX;
use tracing::{debug, warn};

/// Write `data` to `target` atomically: a temporary sibling is written
/// first and then renamed over the target. Parent directories are created.
/// The temporary file is removed when either step fails.
pub async fn write_atomic(target: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp_path = temp_sibling(target);
    debug!(?tmp_path, bytes = data.len(), "writing to temporary file");
    if let Err(e) = tokio::fs::write(&tmp_path, data).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, target).await {
        warn!(?tmp_path, error = %e, "rename failed, removing temporary file");
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}

fn temp_sibling(target: &Path) -> PathBuf {
    let mut p = target.as_os_str().to_owned();
    p.push(PARTIAL_DOWNLOAD_SUFFIX);
    PathBuf::from(p)
}
