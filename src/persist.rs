//! Whole-file JSON persistence shared by the index and the ledger.
//!
//! Both files are small and rewritten in full on every save. The new content is
//! written to a sibling temp file and renamed over the target so a crash never
//! leaves a half-written document behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::trace;

/// Errors raised while saving a JSON document.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Creating, writing or renaming the file failed.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// Target file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The value could not be serialized.
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        /// Target file.
        path: PathBuf,
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },
}

impl PersistError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a serialization error.
    pub fn serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize {
            path: path.into(),
            source,
        }
    }
}

/// Writes `value` to `path` as pretty-printed JSON, replacing any previous file.
///
/// Missing parent directories are created.
///
/// # Errors
///
/// Returns [`PersistError`] when serialization or any filesystem step fails.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistError> {
    let mut content =
        serde_json::to_vec_pretty(value).map_err(|e| PersistError::serialize(path, e))?;
    content.push(b'\n');

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))?;
    }

    let temp_path = temp_sibling(path);
    let write_result = fs::File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(&content)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp_path, path));

    if let Err(error) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(PersistError::io(path, error));
    }

    trace!(path = %path.display(), bytes = content.len(), "saved JSON document");
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
