//! Artifact fetching with streaming SHA256 and retry.
//!
//! The pipeline talks to a [`Fetcher`]; [`HttpFetcher`] is the reqwest
//! implementation. The body is streamed to disk while it is hashed, so the
//! verifier never has to re-read the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use cask_schema::{CaskName, Version};

use crate::Reporter;

/// Errors raised while fetching an artifact.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connection reset, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code.
        status: u16,
    },

    /// Writing the download to disk failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Io(_) => false,
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Same backoff, different attempt budget. Zero is treated as one.
    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// A downloaded file and what it hashed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    /// Where the bytes were written.
    pub path: PathBuf,
    /// Lowercase hex SHA256 of the bytes.
    pub sha256: String,
    /// Number of bytes written.
    pub size: u64,
}

/// One fetch: where from, where to, and whom to tell.
#[derive(Clone, Copy)]
pub struct FetchRequest<'a> {
    /// Cask being fetched (for progress).
    pub name: &'a CaskName,
    /// Version being fetched (for progress).
    pub version: &'a Version,
    /// Source URL.
    pub url: &'a str,
    /// Destination file; overwritten.
    pub dest: &'a Path,
    /// Progress sink.
    pub reporter: &'a dyn Reporter,
}

impl std::fmt::Debug for FetchRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRequest")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("dest", &self.dest)
            .finish_non_exhaustive()
    }
}

/// Downloads an artifact to disk.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `req.url` into `req.dest`, returning the hash of what was written.
    async fn fetch(&self, req: FetchRequest<'_>) -> Result<FetchedArtifact, FetchError>;
}

/// reqwest-backed [`Fetcher`] with exponential backoff.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryConfig,
}

impl HttpFetcher {
    /// Build a fetcher with the crate user agent and default retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_once(&self, req: &FetchRequest<'_>) -> Result<FetchedArtifact, FetchError> {
        let response = self.client.get(req.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: req.url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_size = response.content_length();
        req.reporter
            .downloading(req.name, req.version, 0, total_size);

        let mut file = File::create(req.dest).await?;
        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
            req.reporter
                .downloading(req.name, req.version, downloaded, total_size);
        }

        file.flush().await?;

        Ok(FetchedArtifact {
            path: req.dest.to_path_buf(),
            sha256: hex::encode(hasher.finalize()),
            size: downloaded,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, req: FetchRequest<'_>) -> Result<FetchedArtifact, FetchError> {
        let mut attempt = 0;
        let mut delay = self.retry.initial_delay;

        loop {
            attempt += 1;
            debug!(url = req.url, attempt, "fetching");

            match self.fetch_once(&req).await {
                Ok(artifact) => return Ok(artifact),
                Err(e) if attempt >= self.retry.max_attempts || !e.is_retryable() => {
                    tokio::fs::remove_file(req.dest).await.ok();
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "Download failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempt, self.retry.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.retry.max_delay);
                }
            }
        }
    }
}
