//! Writing generated files into the output directory.
//!
//! Writes are serialised through a process-wide lock and go through a
//! sibling temporary file that is renamed over the target, so a concurrent
//! reader (such as the dev server) never sees a partially written file.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::trace;

static WRITE_LOCK: Mutex<()> = Mutex::new(());

#[derive(thiserror::Error, Debug)]
pub enum ArtifactError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0} has no file name")]
    InvalidPath(PathBuf),
}

/// Atomically replace the file at `path` with `contents`.
pub fn write_artifact(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), ArtifactError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ArtifactError::InvalidPath(path.to_path_buf()))?
        .to_string_lossy()
        .to_string();
    let tmp_path = path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));

    let _guard = WRITE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArtifactError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::write(&tmp_path, contents.as_ref()).map_err(|e| ArtifactError::Write {
        path: tmp_path.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        ArtifactError::Write {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    trace!(path = %path.display(), "wrote artifact");
    Ok(())
}
