use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use indicatif::HumanBytes;
use tracing::{debug, info, warn};

use coursevault_core::index::IndexOrigin;
use coursevault_core::user_agent::tool_identifier;
use coursevault_core::{Decisions, PortalConfig, RunReport, open_session, run};

use crate::app::progress_manager::ConsoleProgress;
use crate::app::prompt::InteractiveDecisions;
use crate::app::terminal;
use crate::cli::Args;

pub(crate) async fn run_coursevault(args: Args) -> Result<()> {
    let mut config = PortalConfig::load(&args.config)
        .with_context(|| format!("cannot start without a valid config ({})", args.config.display()))?;
    config.apply_overrides(args.mode_overrides());

    let _log_guard = terminal::init_tracing(args.default_log_level(), config.log_file.as_deref())?;
    debug!(?args, "CLI arguments parsed");
    info!(
        tool = %tool_identifier(),
        base_url = %config.base_url,
        "Coursevault starting"
    );

    let client = open_session(&config.cookies_file, &config.base_url, config.timeouts())
        .context("cannot open a portal session")?;

    let progress = ConsoleProgress::new(terminal::should_use_progress(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    ));

    let mut decisions = choose_decisions(&config);
    let report = run(&config, &client, &progress, decisions.as_mut()).await?;
    drop(progress);

    if !args.quiet {
        for line in summary_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}

fn choose_decisions(config: &PortalConfig) -> Box<dyn Decisions> {
    if config.static_settings {
        return Box::new(config.static_decisions());
    }
    if !io::stdin().is_terminal() {
        warn!("stdin is not a terminal; answering from config instead of prompting");
        return Box::new(config.static_decisions());
    }
    Box::new(InteractiveDecisions::new(io::stdin().lock(), io::stderr()))
}

pub(crate) fn summary_lines(report: &RunReport) -> Vec<String> {
    let origin = match report.origin {
        IndexOrigin::Reconciled => "saved index",
        IndexOrigin::Crawled => "fresh crawl",
    };
    let summary = report.summary;
    let mut lines = vec![format!(
        "Index ({origin}): {} courses, {} files, {} total, {} on disk",
        summary.courses,
        summary.files,
        HumanBytes(summary.bytes),
        summary.downloaded
    )];

    if report.pending_files == 0 {
        lines.push("Nothing to download.".to_string());
    } else if report.declined {
        lines.push(format!(
            "Skipped downloading {} files ({}).",
            report.pending_files,
            HumanBytes(report.pending_bytes)
        ));
    } else {
        let stats = report.stats;
        lines.push(format!(
            "Downloaded {} files ({}); {} already present, {} refused by the portal, {} failed.",
            stats.downloaded,
            HumanBytes(stats.bytes),
            stats.already_present,
            stats.soft_skipped,
            stats.failed
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursevault_core::DownloadStats;
    use coursevault_core::index::IndexSummary;

    fn report() -> RunReport {
        RunReport {
            summary: IndexSummary {
                courses: 2,
                files: 3,
                bytes: 3072,
                downloaded: 3,
            },
            origin: IndexOrigin::Crawled,
            pending_files: 0,
            pending_bytes: 0,
            stats: DownloadStats::default(),
            declined: false,
        }
    }

    #[test]
    fn test_summary_when_nothing_pending() {
        let lines = summary_lines(&report());
        assert_eq!(
            lines,
            vec![
                "Index (fresh crawl): 2 courses, 3 files, 3.00 KiB total, 3 on disk".to_string(),
                "Nothing to download.".to_string(),
            ]
        );
    }

    #[test]
    fn test_summary_when_declined() {
        let mut report = report();
        report.origin = IndexOrigin::Reconciled;
        report.pending_files = 2;
        report.pending_bytes = 2048;
        report.declined = true;
        let lines = summary_lines(&report);
        assert!(lines[0].starts_with("Index (saved index)"));
        assert_eq!(lines[1], "Skipped downloading 2 files (2.00 KiB).");
    }

    #[test]
    fn test_summary_with_download_stats() {
        let mut report = report();
        report.pending_files = 4;
        report.stats = DownloadStats {
            downloaded: 2,
            already_present: 1,
            soft_skipped: 1,
            failed: 0,
            bytes: 1024,
        };
        let lines = summary_lines(&report);
        assert_eq!(
            lines[1],
            "Downloaded 2 files (1.00 KiB); 1 already present, 1 refused by the portal, 0 failed."
        );
    }
}
