//! Portal HTTP access and the download pass.
//!
//! # Features
//!
//! - One cookie-carrying client per run, browser User-Agent, connect and read timeouts
//! - Streaming downloads (memory use independent of file size)
//! - Partial files removed when a transfer fails
//! - Explicit outcomes: downloaded, already there, soft-skipped, or an error
//!
//! # Example
//!
//! ```no_run
//! use coursevault_core::download::{FileFetcher, PortalClient, Timeouts};
//! use coursevault_core::ledger::DownloadLedger;
//! use coursevault_core::progress::NoProgress;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PortalClient::anonymous(Timeouts::default())?;
//! let mut ledger = DownloadLedger::load(Path::new("download_log.json"));
//! let fetcher = FileFetcher::new(&client, &NoProgress);
//! let outcome = fetcher
//!     .ensure_downloaded(
//!         "https://canvas.example.edu/files/1/download?download_frd=1",
//!         Path::new("./downloads/Course/Week 1/notes.pdf"),
//!         &mut ledger,
//!     )
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
mod fetcher;

pub use client::{Page, PortalClient};
pub use constants::{CONNECT_TIMEOUT_SECS, MAX_TIMEOUT_SECS, READ_TIMEOUT_SECS, Timeouts};
pub use engine::{DownloadStats, download_pending};
pub use error::{FetchError, FetchOutcome, SOFT_REJECTION_STATUS};
pub use fetcher::FileFetcher;
