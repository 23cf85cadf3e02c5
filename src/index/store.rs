//! Loading and saving the index file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::model::Index;
use crate::persist::{PersistError, write_json_pretty};

/// Location of the persisted index.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the index, or `None` when it is missing or cannot be parsed.
    #[must_use]
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Option<Index> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("no index file yet");
                return None;
            }
            Err(error) => {
                warn!(%error, "index file is unreadable, ignoring it");
                return None;
            }
        };

        match serde_json::from_str::<Index>(&text) {
            Ok(index) => {
                info!(
                    courses = index.courses.len(),
                    files = index.files().count(),
                    "loaded existing index"
                );
                Some(index)
            }
            Err(error) => {
                warn!(%error, "index file is corrupt, ignoring it");
                None
            }
        }
    }

    /// Recomputes aggregates and rewrites the whole file.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the file cannot be written.
    pub fn save(&self, index: &mut Index) -> Result<(), PersistError> {
        index.recompute_totals();
        write_json_pretty(&self.path, index)?;
        debug!(
            path = %self.path.display(),
            files = index.total_files,
            "saved index"
        );
        Ok(())
    }
}
