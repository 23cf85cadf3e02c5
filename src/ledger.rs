//! Durable record of files confirmed on disk.
//!
//! The ledger maps absolute file paths to `true`. It is loaded once per run,
//! written through after every mutation, and never fails to load: a missing
//! file is an empty ledger, an unreadable one is logged and treated the same.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::persist::{PersistError, write_json_pretty};

/// One `{name, value}` pair of the list form of the ledger file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerEntry {
    /// Absolute path.
    pub name: String,
    /// Completion flag.
    pub value: bool,
}

/// Either accepted on-disk shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LedgerDocument {
    Map(BTreeMap<String, bool>),
    List(Vec<LedgerEntry>),
}

impl LedgerDocument {
    fn into_entries(self) -> BTreeMap<String, bool> {
        let pairs: Box<dyn Iterator<Item = (String, bool)>> = match self {
            Self::Map(map) => Box::new(map.into_iter()),
            Self::List(list) => Box::new(list.into_iter().map(|entry| (entry.name, entry.value))),
        };
        pairs.filter(|(_, completed)| *completed).collect()
    }
}

/// Parses ledger JSON in mapping or list-of-pairs form into the mapping form.
///
/// Entries whose value is `false` are dropped.
///
/// # Errors
///
/// Returns the parser error when the text is neither shape.
pub fn parse_ledger(text: &str) -> Result<BTreeMap<String, bool>, serde_json::Error> {
    serde_json::from_str::<LedgerDocument>(text).map(LedgerDocument::into_entries)
}

/// Absolute form of `path` used as the ledger key.
#[must_use]
pub fn ledger_key(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// The standalone download ledger.
#[derive(Debug, Clone)]
pub struct DownloadLedger {
    path: PathBuf,
    entries: BTreeMap<String, bool>,
}

impl DownloadLedger {
    /// Loads the ledger at `path`.
    #[must_use]
    #[instrument(level = "debug", fields(path = %path.display()))]
    pub fn load(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(text) => match parse_ledger(&text) {
                Ok(entries) => {
                    info!(entries = entries.len(), "loaded download ledger");
                    entries
                }
                Err(error) => {
                    warn!(%error, "download ledger is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("no download ledger yet");
                BTreeMap::new()
            }
            Err(error) => {
                warn!(%error, "download ledger is unreadable, starting empty");
                BTreeMap::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Creates an empty ledger that will be saved to `path`.
    #[must_use]
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
        }
    }

    /// Returns true when the absolute form of `file` is recorded.
    #[must_use]
    pub fn contains(&self, file: &Path) -> bool {
        self.entries.contains_key(&ledger_key(file))
    }

    /// Records `file` and saves the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the ledger file cannot be written. The
    /// in-memory entry is kept either way.
    pub fn record(&mut self, file: &Path) -> Result<(), PersistError> {
        if self.entries.insert(ledger_key(file), true).is_none() {
            self.save()?;
        }
        Ok(())
    }

    /// Drops `file` from the ledger and saves it.
    ///
    /// Returns whether the entry existed.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the ledger file cannot be written.
    pub fn revoke(&mut self, file: &Path) -> Result<bool, PersistError> {
        let removed = self.entries.remove(&ledger_key(file)).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Adds every completed entry of `other` and saves if anything changed.
    ///
    /// Returns the number of new entries.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the ledger file cannot be written.
    pub fn merge_from(&mut self, other: &BTreeMap<String, bool>) -> Result<usize, PersistError> {
        let mut added = 0;
        for (key, _) in other.iter().filter(|(_, completed)| **completed) {
            if self.entries.insert(key.clone(), true).is_none() {
                added += 1;
            }
        }
        if added > 0 {
            debug!(added, "merged entries into download ledger");
            self.save()?;
        }
        Ok(added)
    }

    /// Brings the ledger in line with a disk check in one save: every key in
    /// `present` is recorded and every key in `missing` is dropped.
    ///
    /// Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the ledger file cannot be written.
    pub fn sync_keys(&mut self, present: &[String], missing: &[String]) -> Result<bool, PersistError> {
        let mut changed = false;
        for key in present {
            changed |= self.entries.insert(key.clone(), true).is_none();
        }
        for key in missing {
            changed |= self.entries.remove(key).is_some();
        }
        if changed {
            self.save()?;
        }
        Ok(changed)
    }

    /// Writes the ledger in mapping form.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the ledger file cannot be written.
    pub fn save(&self) -> Result<(), PersistError> {
        write_json_pretty(&self.path, &self.entries)
    }

    /// Number of recorded paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All recorded entries.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, bool> {
        &self.entries
    }

    /// Ledger file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
