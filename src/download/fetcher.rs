//! Idempotent "make sure this file is on disk" against the ledger.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use super::client::PortalClient;
use super::error::{FetchError, FetchOutcome};
use crate::REJECTION_TARGET;
use crate::ledger::DownloadLedger;
use crate::progress::ProgressObserver;

/// Fetches files into place and keeps the ledger in step.
#[derive(Clone, Copy)]
pub struct FileFetcher<'a> {
    client: &'a PortalClient,
    observer: &'a dyn ProgressObserver,
}

impl std::fmt::Debug for FileFetcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileFetcher")
            .field("client", self.client)
            .finish_non_exhaustive()
    }
}

impl<'a> FileFetcher<'a> {
    /// Creates a fetcher that reports byte progress to `observer`.
    #[must_use]
    pub fn new(client: &'a PortalClient, observer: &'a dyn ProgressObserver) -> Self {
        Self { client, observer }
    }

    /// Progress observer shared with the fetcher's caller.
    #[must_use]
    pub fn observer(&self) -> &'a dyn ProgressObserver {
        self.observer
    }

    /// Ensures a file exists at `path`, downloading it from `url` only when
    /// neither the ledger nor the filesystem already has it.
    ///
    /// An existing file is trusted as-is and never overwritten. The ledger is
    /// only updated once a file is confirmed on disk.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for transport failures, HTTP errors other than the
    /// soft rejection status, and filesystem errors.
    #[instrument(skip(self, ledger), fields(url = %url, path = %path.display()))]
    pub async fn ensure_downloaded(
        &self,
        url: &str,
        path: &Path,
        ledger: &mut DownloadLedger,
    ) -> Result<FetchOutcome, FetchError> {
        if ledger.contains(path) {
            debug!("already recorded in ledger");
            return Ok(FetchOutcome::AlreadyRecorded);
        }

        ensure_parent_dir(path).await?;

        if tokio::fs::metadata(path)
            .await
            .is_ok_and(|meta| meta.is_file())
        {
            debug!("file already on disk, recording it");
            record(ledger, path);
            return Ok(FetchOutcome::AlreadyPresent);
        }

        self.fetch(url, path, ledger).await
    }

    /// Downloads `url` to `path` unconditionally. An existing file is replaced
    /// only once the new body has arrived in full.
    ///
    /// # Errors
    ///
    /// Same as [`ensure_downloaded`](Self::ensure_downloaded).
    #[instrument(skip(self, ledger), fields(url = %url, path = %path.display()))]
    pub async fn redownload(
        &self,
        url: &str,
        path: &Path,
        ledger: &mut DownloadLedger,
    ) -> Result<FetchOutcome, FetchError> {
        ensure_parent_dir(path).await?;
        self.fetch(url, path, ledger).await
    }

    async fn fetch(
        &self,
        url: &str,
        path: &Path,
        ledger: &mut DownloadLedger,
    ) -> Result<FetchOutcome, FetchError> {
        match self.client.download_to_file(url, path, self.observer).await {
            Ok(bytes) => {
                record(ledger, path);
                Ok(FetchOutcome::Downloaded { bytes })
            }
            Err(error) if error.is_soft_rejection() => {
                info!(target: REJECTION_TARGET, %error, "skipping file the portal will not serve");
                Ok(FetchOutcome::SoftSkipped {
                    status: error.status().unwrap_or_default(),
                })
            }
            Err(error) => Err(error),
        }
    }
}

async fn ensure_parent_dir(path: &Path) -> Result<(), FetchError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FetchError::io(parent, e))?;
    }
    Ok(())
}

/// The file is on disk either way; a ledger that cannot be saved is reported
/// and retried on the next save.
fn record(ledger: &mut DownloadLedger, path: &Path) {
    if let Err(error) = ledger.record(path) {
        warn!(%error, path = %path.display(), "could not save download ledger");
    }
}
