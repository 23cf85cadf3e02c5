//! Coursevault Core Library
//!
//! Indexes a course portal into a course → module → file tree and keeps a
//! resumable local mirror of its files.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Link classification and HTML extraction (pure)
//! - [`ledger`] - Durable record of files confirmed on disk
//! - [`download`] - Portal HTTP client, idempotent file fetcher, download pass
//! - [`index`] - Index model, persistence, crawler and the load/reindex state machine
//! - [`auth`] - Cookie export → authenticated client
//! - [`config`] - JSON run configuration
//! - [`progress`] - Progress observer seam and scoped spinner
//! - [`pipeline`] - A complete run

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod download;
pub mod index;
pub mod ledger;
pub mod parser;
pub mod persist;
pub mod pipeline;
pub mod progress;
pub mod user_agent;

/// Log target for per-module and per-file discovery chatter.
pub const DISCOVERY_TARGET: &str = "coursevault::discovery";

/// Log target for requests the portal refused (HTTP 400 and 403).
pub const REJECTION_TARGET: &str = "coursevault::rejection";

// Re-export commonly used types
pub use auth::{SessionError, load_session_cookies, open_session};
pub use config::{ConfigError, ModeOverrides, PortalConfig};
pub use download::{
    DownloadStats, FetchError, FetchOutcome, FileFetcher, PortalClient, Timeouts,
    download_pending,
};
pub use index::{
    Decisions, Index, IndexBuilder, IndexError, IndexStore, StaticDecisions, prepare,
};
pub use ledger::DownloadLedger;
pub use pipeline::{RunReport, run};
pub use progress::{NoProgress, ProgressObserver, SpinnerGuard};
