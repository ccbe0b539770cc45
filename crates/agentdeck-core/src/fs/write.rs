//! Whole-file replacement for generated documents

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::ReconcileError;

/// Replace `path` with `content`, creating parent directories.
///
/// The content goes to a sibling temp file that is renamed over the
/// destination, so readers never observe a half-written document.
pub async fn write_document(path: &Path, content: &[u8]) -> Result<(), ReconcileError> {
    let write_err = |source| ReconcileError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp = temp_path(path);
    if let Err(source) = fs::write(&tmp, content).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(write_err(source));
    }
    if let Err(source) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(write_err(source));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp.{}", name, std::process::id()))
}
