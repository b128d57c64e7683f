//! Collaborators the lifecycle controller drives.
//!
//! Each capability sits behind a trait so the controller never touches a
//! concrete SDK. The host supplies the camera and permission bridge; the
//! storage, fetch and compression implementations here cover desktop use and
//! tests.

mod camera;
mod compressor;
mod error;
mod fetcher;
mod storage;

use std::sync::Arc;

use cliprelay_permissions::PermissionRequester;

// Re-export public types
pub use camera::{CameraDevice, CapturedMedia, RecordOptions};
pub use compressor::{CompressionQuality, FfmpegCompressor, VideoCompressor};
pub use error::{
    CaptureError, CompressionError, DownloadError, StorageError, DOWNLOAD_ERROR_MESSAGE,
};
pub use fetcher::{AssetFetcher, HttpFetcher};
pub use storage::{
    BlobStore, LocalBlobStore, StorageRef, TransferSnapshot, TransferState, TransferTask,
};

/// The full set of collaborators handed to the controller at construction.
#[derive(Clone)]
pub struct Services {
    pub camera: Arc<dyn CameraDevice>,
    pub compressor: Arc<dyn VideoCompressor>,
    pub storage: Arc<dyn BlobStore>,
    pub fetcher: Arc<dyn AssetFetcher>,
    pub permissions: Arc<dyn PermissionRequester>,
}
