//! Deciding between the saved index and a fresh crawl.
//!
//! ```text
//! NoIndex ──────────────────────────────┐
//!                                       ▼
//! LoadedExisting ──reindex──────────▶ Reindexing ──crawl──┐
//!        │                                                ▼
//!        └──keep──▶ Reconciled ─────────────────────▶ FreshOrMerged (saved)
//! ```
//!
//! Whichever way the run goes, the resulting index has been checked against
//! the disk, its `download_log` agrees with the ledger, and it has been saved.

use tracing::{debug, info, warn};

use super::builder::IndexBuilder;
use super::error::IndexError;
use super::model::{Index, IndexSummary};
use super::store::IndexStore;
use crate::ledger::DownloadLedger;

/// Answers the run's yes/no questions, interactively or from settings.
pub trait Decisions {
    /// Rebuild the index from the network instead of keeping the saved one?
    fn reindex(&mut self, existing: &IndexSummary) -> bool;

    /// Fetch every file again, replacing local copies?
    ///
    /// `reindexing` is true when the index was (or is about to be) crawled.
    fn redownload(&mut self, reindexing: bool) -> bool;

    /// Go ahead with downloading `files` entries totalling `bytes`?
    fn proceed(&mut self, files: usize, bytes: u64) -> bool;
}

/// Unattended answers taken from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticDecisions {
    pub always_reindex: bool,
    pub always_redownload: bool,
}

impl Decisions for StaticDecisions {
    fn reindex(&mut self, _existing: &IndexSummary) -> bool {
        self.always_reindex
    }

    fn redownload(&mut self, _reindexing: bool) -> bool {
        self.always_redownload
    }

    fn proceed(&mut self, _files: usize, _bytes: u64) -> bool {
        true
    }
}

/// Where the prepared index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    /// The saved index was kept and reconciled.
    Reconciled,
    /// The index was crawled from the portal.
    Crawled,
}

/// An index ready for the download pass.
#[derive(Debug, Clone)]
pub struct PreparedIndex {
    pub index: Index,
    pub origin: IndexOrigin,
    /// Whether every file should be fetched again.
    pub redownload: bool,
}

/// States of the preparation machine.
#[derive(Debug)]
pub enum IndexState {
    NoIndex,
    LoadedExisting(Index),
    Reindexing,
    Reconciled { index: Index, redownload: bool },
    FreshOrMerged(PreparedIndex),
}

impl IndexState {
    fn name(&self) -> &'static str {
        match self {
            Self::NoIndex => "no_index",
            Self::LoadedExisting(_) => "loaded_existing",
            Self::Reindexing => "reindexing",
            Self::Reconciled { .. } => "reconciled",
            Self::FreshOrMerged(_) => "fresh_or_merged",
        }
    }
}

/// Loads or crawls the index, reconciles it with disk and ledger, and saves it.
///
/// # Errors
///
/// Returns [`IndexError`] when a crawl cannot fetch the course list or the
/// index cannot be saved.
pub async fn prepare(
    store: &IndexStore,
    ledger: &mut DownloadLedger,
    builder: &IndexBuilder<'_>,
    decisions: &mut dyn Decisions,
) -> Result<PreparedIndex, IndexError> {
    let mut state = match store.load() {
        Some(index) => IndexState::LoadedExisting(index),
        None => IndexState::NoIndex,
    };

    loop {
        debug!(state = state.name(), "index preparation");
        state = match state {
            IndexState::NoIndex => IndexState::Reindexing,
            IndexState::LoadedExisting(index) => {
                if let Err(error) = ledger.merge_from(&index.download_log) {
                    warn!(%error, "could not save download ledger after merging index log");
                }
                let summary = index.summary();
                info!(
                    courses = summary.courses,
                    files = summary.files,
                    "found existing index"
                );
                if decisions.reindex(&summary) {
                    IndexState::Reindexing
                } else {
                    let redownload = decisions.redownload(false);
                    let mut index = index;
                    let report = index.reconcile(ledger);
                    info!(
                        present = report.present,
                        missing = report.missing,
                        "reconciled existing index"
                    );
                    IndexState::Reconciled { index, redownload }
                }
            }
            IndexState::Reindexing => {
                let mut index = builder.crawl().await?;
                index.reconcile(ledger);
                let redownload = decisions.redownload(true);
                IndexState::FreshOrMerged(PreparedIndex {
                    index,
                    origin: IndexOrigin::Crawled,
                    redownload,
                })
            }
            IndexState::Reconciled { index, redownload } => {
                IndexState::FreshOrMerged(PreparedIndex {
                    index,
                    origin: IndexOrigin::Reconciled,
                    redownload,
                })
            }
            IndexState::FreshOrMerged(mut prepared) => {
                store
                    .save(&mut prepared.index)
                    .map_err(IndexError::Persist)?;
                return Ok(prepared);
            }
        };
    }
}
