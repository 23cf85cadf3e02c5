//! Constants for the download module (timeouts).

use std::time::Duration;

/// Default HTTP connect timeout (15 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Default per-read timeout (15 seconds between body chunks).
pub const READ_TIMEOUT_SECS: u64 = 15;

/// Largest accepted timeout value (1 hour).
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Connect and read timeouts for the portal client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Time allowed to establish a connection.
    pub connect: Duration,
    /// Time allowed between reads; large files are fine as long as bytes keep coming.
    pub read: Duration,
}

impl Timeouts {
    /// Builds timeouts from whole seconds.
    #[must_use]
    pub const fn from_secs(connect_secs: u64, read_secs: u64) -> Self {
        Self {
            connect: Duration::from_secs(connect_secs),
            read: Duration::from_secs(read_secs),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_secs(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }
}
