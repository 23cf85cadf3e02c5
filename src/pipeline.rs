//! One complete run: prepare the index, then fetch what is missing.

use tracing::{info, instrument, warn};

use crate::config::PortalConfig;
use crate::download::{DownloadStats, FileFetcher, PortalClient, download_pending};
use crate::index::{
    Decisions, IndexBuilder, IndexError, IndexOrigin, IndexStore, IndexSummary, PreparedIndex,
    prepare,
};
use crate::ledger::DownloadLedger;
use crate::progress::ProgressObserver;

/// What a run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Index numbers after the run.
    pub summary: IndexSummary,
    pub origin: IndexOrigin,
    /// Files and bytes the download pass was going to fetch.
    pub pending_files: usize,
    pub pending_bytes: u64,
    /// Download counts; all zero when nothing was attempted.
    pub stats: DownloadStats,
    /// The operator declined the download pass.
    pub declined: bool,
}

/// Runs the pipeline with `client` as the authenticated session.
///
/// # Errors
///
/// Returns [`IndexError`] when the course list cannot be fetched during a
/// crawl or the index cannot be saved. Per-file problems only show up in the
/// report's stats.
#[instrument(skip_all, fields(base_url = %config.base_url))]
pub async fn run(
    config: &PortalConfig,
    client: &PortalClient,
    observer: &dyn ProgressObserver,
    decisions: &mut dyn Decisions,
) -> Result<RunReport, IndexError> {
    let store = IndexStore::new(&config.index_file);
    let mut ledger = DownloadLedger::load(&config.ledger_file);
    let settings = config.build_settings();
    let builder = IndexBuilder::new(client, &settings, observer);

    let PreparedIndex {
        mut index,
        origin,
        redownload,
    } = prepare(&store, &mut ledger, &builder, decisions).await?;

    let (pending_files, pending_bytes) = index.pending(redownload);
    let mut report = RunReport {
        summary: index.summary(),
        origin,
        pending_files,
        pending_bytes,
        stats: DownloadStats::default(),
        declined: false,
    };

    if pending_files == 0 {
        info!("every indexed file is already on disk");
        return Ok(report);
    }
    if !decisions.proceed(pending_files, pending_bytes) {
        info!(files = pending_files, "download declined");
        report.declined = true;
        return Ok(report);
    }

    let fetcher = FileFetcher::new(client, observer);
    report.stats = download_pending(&mut index, &mut ledger, &fetcher, redownload).await;

    store.save(&mut index).map_err(IndexError::Persist)?;
    if let Err(error) = ledger.merge_from(&index.download_log) {
        warn!(%error, "could not save download ledger");
    }

    report.summary = index.summary();
    Ok(report)
}
