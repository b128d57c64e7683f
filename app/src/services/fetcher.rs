use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use log::{debug, info};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::DownloadError;

/// Extension used when the URL path carries none.
const DEFAULT_EXTENSION: &str = "mp4";

/// Fetches a remote asset into local transient storage.
#[async_trait::async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Single attempt; returns the local path of the fetched file.
    async fn fetch(&self, url: &str, cancel_token: &CancellationToken)
        -> Result<PathBuf, DownloadError>;
}

/// Fetcher for `http(s)://` and `file://` URLs with an on-disk cache.
///
/// Each URL maps to one cache file named after the SHA-256 of the URL; a new
/// fetch of the same URL replaces it.
pub struct HttpFetcher {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl HttpFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache location for `url`, keeping the URL's file extension.
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
        let extension = url_extension(url).unwrap_or(DEFAULT_EXTENSION);
        self.cache_dir
            .join(format!("{}.{}", &digest[..16], extension))
    }

    async fn fetch_file_url(
        &self,
        source: &Path,
        partial_path: &Path,
        cancel_token: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let mut reader = tokio::fs::File::open(source).await?;
        let mut writer = tokio::io::BufWriter::new(tokio::fs::File::create(partial_path).await?);

        // Dropping the copy future on cancel stops further writes
        let bytes = tokio::select! {
            _ = cancel_token.cancelled() => return Err(DownloadError::Cancelled),
            copied = tokio::io::copy(&mut reader, &mut writer) => copied?,
        };
        writer.flush().await?;
        debug!("Copied {} bytes from {:?}", bytes, source);
        Ok(())
    }

    async fn fetch_http_url(
        &self,
        url: &str,
        partial_path: &Path,
        cancel_token: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let response = tokio::select! {
            _ = cancel_token.cancelled() => return Err(DownloadError::Cancelled),
            response = self.client.get(url).send() => response?,
        };

        if !response.status().is_success() {
            return Err(DownloadError::BadStatus(response.status()));
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(partial_path)
            .await?;

        let mut file = tokio::io::BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        while let Some(chunk_result) = stream.next().await {
            if cancel_token.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }

            let chunk = chunk_result?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await?;
        debug!("Downloaded {} bytes from {}", downloaded, url);
        Ok(())
    }
}

#[async_trait::async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        cancel_token: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let final_path = self.cache_path(url);
        // Overlapping fetches of one URL each write their own scratch file
        let partial_path =
            final_path.with_extension(format!("{}.partial", Uuid::new_v4().simple()));

        let result = if let Some(local) = url.strip_prefix("file://") {
            self.fetch_file_url(Path::new(local), &partial_path, cancel_token)
                .await
        } else if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_http_url(url, &partial_path, cancel_token).await
        } else {
            return Err(DownloadError::UnsupportedUrl(url.to_string()));
        };

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(e);
        }

        if cancel_token.is_cancelled() {
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(DownloadError::Cancelled);
        }

        tokio::fs::rename(&partial_path, &final_path).await?;
        info!("Fetched {} into {:?}", url, final_path);
        Ok(final_path)
    }
}

/// Extension of the last path segment, ignoring query and fragment.
fn url_extension(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let (_, path) = after_scheme.split_once('/')?;
    let segment = path.rsplit('/').next()?;
    let (_, extension) = segment.rsplit_once('.')?;

    let valid = !extension.is_empty()
        && extension.len() <= 5
        && extension.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(extension)
}
