//! Session provider: turns a browser cookie export into an authenticated client.
//!
//! The run never proceeds unauthenticated. A missing, unparsable or empty
//! cookie file is an error.

mod cookies;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::cookie::Jar;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

use crate::download::{PortalClient, Timeouts};

pub use cookies::{SessionCookie, load_cookies_into_jar, parse_cookie_export};

/// Errors building the portal session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The cookie file could not be read.
    #[error("cannot read cookie file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cookie file is not a JSON cookie export.
    #[error("cannot parse cookie file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The cookie file holds no cookies.
    #[error("cookie file {path} contains no cookies")]
    Empty { path: PathBuf },

    /// The portal URL cannot scope cookies.
    #[error("invalid portal URL: {url}")]
    InvalidBaseUrl { url: String },

    /// The HTTP client could not be built.
    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Reads the cookie export at `path` into a jar scoped to `base_url`.
///
/// # Errors
///
/// Returns [`SessionError`] when the file is missing, unparsable or empty, or
/// when `base_url` is not a URL.
#[instrument(level = "debug", fields(path = %path.display()))]
pub fn load_session_cookies(path: &Path, base_url: &str) -> Result<Arc<Jar>, SessionError> {
    let portal = Url::parse(base_url).map_err(|_| SessionError::InvalidBaseUrl {
        url: base_url.to_string(),
    })?;
    let text = std::fs::read_to_string(path).map_err(|source| SessionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cookies = parse_cookie_export(&text).map_err(|source| SessionError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if cookies.is_empty() {
        return Err(SessionError::Empty {
            path: path.to_path_buf(),
        });
    }

    info!(count = cookies.len(), "loaded session cookies");
    Ok(load_cookies_into_jar(&cookies, &portal))
}

/// Builds the run's authenticated client from the cookie export at `path`.
///
/// # Errors
///
/// Returns [`SessionError`] as [`load_session_cookies`] does, or
/// [`SessionError::Client`] when the client cannot be built.
pub fn open_session(
    path: &Path,
    base_url: &str,
    timeouts: Timeouts,
) -> Result<PortalClient, SessionError> {
    let jar = load_session_cookies(path, base_url)?;
    PortalClient::with_cookie_jar(jar, timeouts).map_err(SessionError::Client)
}
