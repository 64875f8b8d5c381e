//! Static file collection: mirrors the static source tree into the
//! directory the front proxy serves from.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Copy every file under `source` into `target`, keeping relative paths.
///
/// Existing files are overwritten. Returns the number of files copied;
/// a missing source directory copies nothing.
pub async fn collect(source: &Path, target: &Path) -> Result<usize> {
    if !fs::try_exists(source).await.unwrap_or(false) {
        warn!(source = %source.display(), "Static source directory does not exist");
        return Ok(0);
    }

    let mut copied = 0;
    let mut pending: Vec<PathBuf> = vec![PathBuf::new()];

    while let Some(relative) = pending.pop() {
        let dir = source.join(&relative);
        fs::create_dir_all(target.join(&relative))
            .await
            .map_err(|e| Error::Internal(format!("Failed to create {}: {}", target.display(), e)))?;

        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| Error::Internal(format!("Failed to read {}: {}", dir.display(), e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Internal(format!("Failed to read directory entry: {}", e)))?
        {
            let child = relative.join(entry.file_name());
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                pending.push(child);
            } else if file_type.is_file() {
                fs::copy(entry.path(), target.join(&child)).await.map_err(|e| {
                    Error::Internal(format!("Failed to copy {}: {}", child.display(), e))
                })?;
                debug!(file = %child.display(), "Collected static file");
                copied += 1;
            }
        }
    }

    Ok(copied)
}
