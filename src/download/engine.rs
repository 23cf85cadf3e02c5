//! The download pass over an index.
//!
//! Entries are handled one at a time in index order. Each outcome is counted;
//! a failed file is logged and the pass moves on.

use tracing::{info, instrument, warn};

use super::error::FetchOutcome;
use super::fetcher::FileFetcher;
use crate::index::Index;
use crate::ledger::DownloadLedger;

/// Counts from one download pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Files streamed from the portal.
    pub downloaded: usize,
    /// Files already on disk or in the ledger.
    pub already_present: usize,
    /// Files the portal refused with a soft rejection.
    pub soft_skipped: usize,
    /// Files that failed for any other reason.
    pub failed: usize,
    /// Bytes written.
    pub bytes: u64,
}

impl DownloadStats {
    /// Total entries handled.
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloaded + self.already_present + self.soft_skipped + self.failed
    }
}

/// Fetches every pending entry of `index`.
///
/// Pending means `downloaded == false`, or every entry when `redownload` is
/// set. Entries that end up on disk are flagged `downloaded` and recorded in
/// both `download_log` and the ledger. A failed entry keeps its flag only if
/// its file is still on disk; otherwise it loses its credit in both.
#[instrument(skip_all, fields(redownload = redownload))]
pub async fn download_pending(
    index: &mut Index,
    ledger: &mut DownloadLedger,
    fetcher: &FileFetcher<'_>,
    redownload: bool,
) -> DownloadStats {
    let (pending_files, pending_bytes) = index.pending(redownload);
    info!(files = pending_files, bytes = pending_bytes, "starting downloads");
    fetcher.observer().downloads_started(pending_files, pending_bytes);

    let mut stats = DownloadStats::default();
    let mut completed = Vec::new();
    let mut revoked = Vec::new();

    for file in index
        .courses
        .iter_mut()
        .flat_map(|course| &mut course.modules)
        .flat_map(|module| &mut module.files)
    {
        if file.downloaded && !redownload {
            continue;
        }

        let result = if redownload {
            fetcher.redownload(&file.url, &file.path, ledger).await
        } else {
            fetcher.ensure_downloaded(&file.url, &file.path, ledger).await
        };

        match result {
            Ok(outcome) => {
                match outcome {
                    FetchOutcome::Downloaded { bytes } => {
                        stats.downloaded += 1;
                        stats.bytes += bytes;
                    }
                    FetchOutcome::AlreadyRecorded | FetchOutcome::AlreadyPresent => {
                        stats.already_present += 1;
                    }
                    FetchOutcome::SoftSkipped { .. } => stats.soft_skipped += 1,
                }
                if outcome.is_on_disk() {
                    file.downloaded = true;
                    completed.push(file.path.clone());
                }
            }
            Err(error) => {
                stats.failed += 1;
                warn!(file = %file.name, %error, "download failed");
                file.downloaded = file.path.is_file();
                if !file.downloaded {
                    revoked.push(file.path.clone());
                }
            }
        }
        fetcher.observer().file_finished(&file.name);
    }

    for path in &completed {
        index.mark_downloaded(path);
    }
    for path in &revoked {
        index.unmark_downloaded(path);
        if let Err(error) = ledger.revoke(path) {
            warn!(%error, path = %path.display(), "could not save download ledger");
        }
    }

    info!(
        downloaded = stats.downloaded,
        already_present = stats.already_present,
        soft_skipped = stats.soft_skipped,
        failed = stats.failed,
        bytes = stats.bytes,
        "downloads finished"
    );
    stats
}
