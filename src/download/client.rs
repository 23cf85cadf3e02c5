//! HTTP client wrapper for talking to the portal.
//!
//! One [`PortalClient`] is built per run and reused for every request so the
//! session cookies and connection pool are shared. It fetches pages, probes
//! file sizes, and streams file bodies to disk.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Response};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::Timeouts;
use super::error::FetchError;
use crate::REJECTION_TARGET;
use crate::progress::ProgressObserver;
use crate::user_agent::BROWSER_USER_AGENT;

/// A fetched HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// URL after redirects.
    pub final_url: String,
    /// Response body.
    pub body: String,
}

/// HTTP client carrying the portal session.
#[derive(Debug, Clone)]
pub struct PortalClient {
    client: Client,
}

impl PortalClient {
    /// Creates a client that sends the cookies in `cookie_jar` with every
    /// matching request.
    ///
    /// Redirects are followed, gzip bodies are decoded, and the browser
    /// User-Agent is sent.
    ///
    /// # Errors
    ///
    /// Returns the builder error when the TLS backend cannot be initialised.
    #[instrument(level = "debug", skip(cookie_jar))]
    pub fn with_cookie_jar(cookie_jar: Arc<Jar>, timeouts: Timeouts) -> Result<Self, reqwest::Error> {
        let client = base_client_builder(timeouts)
            .cookie_provider(cookie_jar)
            .build()?;
        Ok(Self { client })
    }

    /// Creates a client without cookies.
    ///
    /// # Errors
    ///
    /// Returns the builder error when the TLS backend cannot be initialised.
    pub fn anonymous(timeouts: Timeouts) -> Result<Self, reqwest::Error> {
        let client = base_client_builder(timeouts).build()?;
        Ok(Self { client })
    }

    /// Fetches a page and returns its final URL and body text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for transport failures and non-success statuses.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get_page(&self, url: &str) -> Result<Page, FetchError> {
        let response = self.send(self.client.get(url), url).await?;
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_transport(url, e))?;
        debug!(final_url = %final_url, bytes = body.len(), "fetched page");
        Ok(Page { final_url, body })
    }

    /// Asks the server for a file's size without downloading it.
    ///
    /// A missing or unparsable `Content-Length` header yields 0.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for transport failures and non-success statuses.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn probe_size(&self, url: &str) -> Result<u64, FetchError> {
        let response = self.send(self.client.head(url), url).await?;
        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0);
        Ok(size)
    }

    /// Streams the body at `url` into `path`.
    ///
    /// The body is written chunk by chunk to a `.part` sibling, which is renamed
    /// onto `path` only after the last chunk is flushed. A failed transfer
    /// removes the `.part` file and leaves any existing file at `path` as it
    /// was. The parent directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for transport failures, non-success statuses, and
    /// filesystem errors.
    #[instrument(skip(self, observer), fields(url = %url, path = %path.display()))]
    pub async fn download_to_file(
        &self,
        url: &str,
        path: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<u64, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        let response = self.send(self.client.get(url), url).await?;

        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let part_path = partial_path(path);
        let mut file = File::create(&part_path)
            .await
            .map_err(|e| FetchError::io(&part_path, e))?;

        observer.transfer_started(&display_name, response.content_length());
        let stream_result = stream_to_file(&mut file, response, url, &part_path, observer).await;
        observer.transfer_finished();
        drop(file);

        let bytes = match stream_result {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(part = %part_path.display(), "removing partial file after error");
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(error);
            }
        };

        if let Err(error) = tokio::fs::rename(&part_path, path).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(FetchError::io(path, error));
        }

        info!(bytes, "download complete");
        Ok(bytes)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<Response, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            if matches!(status, 400 | 403) {
                info!(target: REJECTION_TARGET, status, url, "portal rejected request");
            }
            return Err(FetchError::http_status(url, status));
        }
        Ok(response)
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: Response,
    url: &str,
    file_path: &Path,
    observer: &dyn ProgressObserver,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::from_transport(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path, e))?;

        let len = chunk.len() as u64;
        bytes_written += len;
        observer.transfer_progress(len);
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path, e))?;

    Ok(bytes_written)
}

/// In-progress sibling of `path`: `notes.pdf` streams into `notes.pdf.part`.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

fn base_client_builder(timeouts: Timeouts) -> reqwest::ClientBuilder {
    Client::builder()
        .connect_timeout(timeouts.connect)
        .read_timeout(timeouts.read)
        .gzip(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(BROWSER_USER_AGENT)
}
