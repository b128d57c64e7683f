use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::StorageError;

/// Chunk size for local uploads; one progress snapshot per chunk.
const UPLOAD_CHUNK_BYTES: usize = 256 * 1024;

/// Name of an object slot in the blob store, e.g. `"video"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(transparent)]
pub struct StorageRef(String);

impl StorageRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StorageRef {
    fn default() -> Self {
        Self::new("video")
    }
}

/// Phase reported by a transfer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransferState {
    Running,
    Paused,
    Success,
    Error,
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Success | TransferState::Error)
    }
}

/// One state-changed notification from a transfer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSnapshot {
    pub state: TransferState,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl TransferSnapshot {
    /// Completion in whole percent, rounded to nearest and clamped to 100.
    ///
    /// Non-decreasing in `bytes_transferred` for a fixed total. A zero total
    /// counts as 0%.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 0;
        }
        let ratio = self.bytes_transferred as f64 / self.total_bytes as f64;
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Handle to an in-flight upload.
///
/// Snapshots arrive in order; the stream ends after a terminal state or when
/// the task is cancelled.
pub struct TransferTask {
    snapshots: mpsc::Receiver<TransferSnapshot>,
    cancel_token: CancellationToken,
}

impl TransferTask {
    pub fn new(snapshots: mpsc::Receiver<TransferSnapshot>, cancel_token: CancellationToken) -> Self {
        Self {
            snapshots,
            cancel_token,
        }
    }

    /// Next state change, or `None` once the task has finished.
    pub async fn next_snapshot(&mut self) -> Option<TransferSnapshot> {
        self.snapshots.recv().await
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

/// Remote object store holding the asset slot.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// URL the asset can be fetched from. Fails with [`StorageError::NotFound`]
    /// when nothing has been uploaded to `reference` yet.
    async fn download_url(&self, reference: &StorageRef) -> Result<String, StorageError>;

    /// Start uploading `local` into `reference`, replacing whatever is there.
    async fn put_file(
        &self,
        reference: &StorageRef,
        local: &Path,
    ) -> Result<TransferTask, StorageError>;
}

/// Blob store backed by a local directory: one file per reference.
///
/// Useful on desktop, in tests, and against a synced folder.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        info!("Local blob store root: {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `reference`. References are flat names, never paths.
    pub fn object_path(&self, reference: &StorageRef) -> Result<PathBuf, StorageError> {
        let name = reference.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StorageError::InvalidReference(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    async fn copy_with_progress(
        source: &Path,
        partial_path: &Path,
        final_path: &Path,
        total_bytes: u64,
        tx: &mpsc::Sender<TransferSnapshot>,
        cancel_token: &CancellationToken,
    ) -> Result<bool, StorageError> {
        let mut reader = tokio::fs::File::open(source).await?;
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(partial_path)
            .await?;
        let mut writer = tokio::io::BufWriter::new(file);
        let mut buffer = vec![0u8; UPLOAD_CHUNK_BYTES];
        let mut transferred = 0u64;

        loop {
            if cancel_token.is_cancelled() {
                return Ok(false);
            }

            let bytes_read = reader.read(&mut buffer).await?;
            if bytes_read == 0 {
                break;
            }

            writer.write_all(&buffer[..bytes_read]).await?;
            transferred += bytes_read as u64;

            let _ = tx
                .send(TransferSnapshot {
                    state: TransferState::Running,
                    bytes_transferred: transferred,
                    total_bytes,
                })
                .await;
        }

        writer.flush().await?;
        drop(writer);

        if transferred != total_bytes {
            return Err(StorageError::TransferFailed(format!(
                "source changed size during upload ({} of {} bytes)",
                transferred, total_bytes
            )));
        }
        if cancel_token.is_cancelled() {
            return Ok(false);
        }

        // Replace the slot in one step so readers never see a half-written object
        tokio::fs::rename(partial_path, final_path).await?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl BlobStore for LocalBlobStore {
    async fn download_url(&self, reference: &StorageRef) -> Result<String, StorageError> {
        let path = self.object_path(reference)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(reference.to_string()));
        }
        Ok(format!("file://{}", path.display()))
    }

    async fn put_file(
        &self,
        reference: &StorageRef,
        local: &Path,
    ) -> Result<TransferTask, StorageError> {
        let final_path = self.object_path(reference)?;
        // One scratch file per upload; a superseded upload only ever removes its own
        let partial_path = self.root.join(format!(
            ".{}.{}.partial",
            reference.as_str(),
            Uuid::new_v4().simple()
        ));
        let total_bytes = tokio::fs::metadata(local).await?.len();

        let (tx, rx) = mpsc::channel(32);
        let cancel_token = CancellationToken::new();
        let task_token = cancel_token.clone();
        let source = local.to_path_buf();
        let reference = reference.clone();

        tokio::spawn(async move {
            let result = Self::copy_with_progress(
                &source,
                &partial_path,
                &final_path,
                total_bytes,
                &tx,
                &task_token,
            )
            .await;

            match result {
                Ok(true) => {
                    info!("Uploaded {:?} to '{}' ({} bytes)", source, reference, total_bytes);
                    let _ = tx
                        .send(TransferSnapshot {
                            state: TransferState::Success,
                            bytes_transferred: total_bytes,
                            total_bytes,
                        })
                        .await;
                }
                Ok(false) => {
                    debug!("Upload to '{}' cancelled", reference);
                    let _ = tokio::fs::remove_file(&partial_path).await;
                }
                Err(e) => {
                    error!("Upload to '{}' failed: {}", reference, e);
                    if let Err(cleanup) = tokio::fs::remove_file(&partial_path).await {
                        warn!("Failed to remove partial upload: {}", cleanup);
                    }
                    let _ = tx
                        .send(TransferSnapshot {
                            state: TransferState::Error,
                            bytes_transferred: 0,
                            total_bytes,
                        })
                        .await;
                }
            }
        });

        Ok(TransferTask::new(rx, cancel_token))
    }
}
