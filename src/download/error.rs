//! Error and outcome types for portal fetches.
//!
//! Successful and soft-skipped fetches are [`FetchOutcome`] values; everything
//! that should be logged as a failure of the unit is a [`FetchError`].

use std::path::PathBuf;

use thiserror::Error;

/// HTTP status the portal uses for resources that cannot be fetched at all.
pub const SOFT_REJECTION_STATUS: u16 = 400;

/// Errors that can occur while fetching a page or a file.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL being fetched.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Connecting or reading timed out.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error (create directory, create file, write).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Classifies a transport error as timeout or network failure.
    pub fn from_transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for the portal's "not fetchable" rejection (HTTP 400).
    ///
    /// Callers treat these as a skip rather than a failure and never retry them.
    #[must_use]
    pub fn is_soft_rejection(&self) -> bool {
        self.status() == Some(SOFT_REJECTION_STATUS)
    }
}

/// Non-failing results of [`FileFetcher`](super::FileFetcher) calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The ledger already had the path; nothing was touched.
    AlreadyRecorded,
    /// A file already existed at the path and was recorded as-is.
    AlreadyPresent,
    /// The body was streamed to disk.
    Downloaded {
        /// Bytes written.
        bytes: u64,
    },
    /// The portal refused the resource with a soft rejection status.
    SoftSkipped {
        /// Status returned by the portal.
        status: u16,
    },
}

impl FetchOutcome {
    /// Returns true when a file is on disk at the target path afterwards.
    #[must_use]
    pub fn is_on_disk(self) -> bool {
        !matches!(self, Self::SoftSkipped { .. })
    }
}
