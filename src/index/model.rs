//! Persisted index shapes and the operations on them that need no network.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ledger::{DownloadLedger, ledger_key};
use crate::parser::sanitize_path_segment;

/// One downloadable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Local filename.
    pub name: String,
    /// Absolute download URL.
    pub url: String,
    /// Size in bytes, 0 when unknown.
    #[serde(default)]
    pub size: u64,
    /// Whether a regular file exists at `path` as of the last check.
    #[serde(default)]
    pub downloaded: bool,
    /// Local path, derived from download root, course, module and name.
    pub path: PathBuf,
}

/// A course module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Sanitized module name.
    pub name: String,
    /// Files in discovery order.
    #[serde(default, alias = "items")]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub total_files: usize,
    #[serde(default)]
    pub total_size: u64,
}

/// A course and its modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Portal-assigned id.
    pub id: String,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub total_modules: usize,
    #[serde(default)]
    pub total_files: usize,
    #[serde(default)]
    pub total_size: u64,
}

/// The whole persisted index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default)]
    pub courses: Vec<Course>,
    /// Absolute path to `true` for every file known to be on disk.
    #[serde(default)]
    pub download_log: BTreeMap<String, bool>,
    #[serde(default)]
    pub total_courses: usize,
    #[serde(default)]
    pub total_files: usize,
    #[serde(default)]
    pub total_size: u64,
}

/// Headline numbers of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub courses: usize,
    pub files: usize,
    pub bytes: u64,
    pub downloaded: usize,
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries whose file exists.
    pub present: usize,
    /// Entries whose file is missing.
    pub missing: usize,
}

/// Local path of a file: `<root>/<course>/<module>/<name>`.
///
/// Every segment is sanitized, so the result depends only on its inputs.
#[must_use]
pub fn file_path(download_root: &Path, course_name: &str, module_name: &str, name: &str) -> PathBuf {
    module_dir(download_root, course_name, module_name).join(sanitize_path_segment(name))
}

/// Directory holding a module's files and page notes.
#[must_use]
pub fn module_dir(download_root: &Path, course_name: &str, module_name: &str) -> PathBuf {
    download_root
        .join(sanitize_path_segment(course_name))
        .join(sanitize_path_segment(module_name))
}

impl Module {
    /// Creates an empty module.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Index {
    /// Recomputes every aggregate bottom-up from the file entries.
    pub fn recompute_totals(&mut self) {
        for course in &mut self.courses {
            for module in &mut course.modules {
                module.total_files = module.files.len();
                module.total_size = module.files.iter().map(|file| file.size).sum();
            }
            course.total_modules = course.modules.len();
            course.total_files = course.modules.iter().map(|module| module.total_files).sum();
            course.total_size = course.modules.iter().map(|module| module.total_size).sum();
        }
        self.total_courses = self.courses.len();
        self.total_files = self.courses.iter().map(|course| course.total_files).sum();
        self.total_size = self.courses.iter().map(|course| course.total_size).sum();
    }

    /// Iterates over every file entry.
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.courses
            .iter()
            .flat_map(|course| &course.modules)
            .flat_map(|module| &module.files)
    }

    /// Number of files and bytes the download pass will attempt.
    #[must_use]
    pub fn pending(&self, redownload: bool) -> (usize, u64) {
        self.files()
            .filter(|file| redownload || !file.downloaded)
            .fold((0, 0), |(count, bytes), file| (count + 1, bytes + file.size))
    }

    /// Headline numbers from the current entries.
    #[must_use]
    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            courses: self.courses.len(),
            files: self.files().count(),
            bytes: self.files().map(|file| file.size).sum(),
            downloaded: self.files().filter(|file| file.downloaded).count(),
        }
    }

    /// Records `path` as on disk in `download_log`.
    pub fn mark_downloaded(&mut self, path: &Path) {
        self.download_log.insert(ledger_key(path), true);
    }

    /// Drops `path` from `download_log`.
    pub fn unmark_downloaded(&mut self, path: &Path) {
        self.download_log.remove(&ledger_key(path));
    }

    /// Sets every entry's `downloaded` flag from the filesystem.
    ///
    /// Present files are recorded in `download_log` and the ledger; missing
    /// ones lose any earlier credit in both, so the next download pass fetches
    /// them again.
    pub fn reconcile(&mut self, ledger: &mut DownloadLedger) -> ReconcileReport {
        let mut present = Vec::new();
        let mut missing = Vec::new();

        for file in self
            .courses
            .iter_mut()
            .flat_map(|course| &mut course.modules)
            .flat_map(|module| &mut module.files)
        {
            file.downloaded = file.path.is_file();
            let key = ledger_key(&file.path);
            if file.downloaded {
                present.push(key);
            } else {
                missing.push(key);
            }
        }

        for key in &present {
            self.download_log.insert(key.clone(), true);
        }
        for key in &missing {
            self.download_log.remove(key);
        }
        if let Err(error) = ledger.sync_keys(&present, &missing) {
            warn!(%error, "could not save download ledger after reconciliation");
        }

        let report = ReconcileReport {
            present: present.len(),
            missing: missing.len(),
        };
        debug!(present = report.present, missing = report.missing, "reconciled index with disk");
        report
    }
}
