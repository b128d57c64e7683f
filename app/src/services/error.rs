/// Text shown in the playback overlay when the asset could not be fetched
pub const DOWNLOAD_ERROR_MESSAGE: &str = "Something went wrong";

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("Recording failed: {0}")]
    RecordingFailed(String),
    #[error("Camera permission denied")]
    PermissionDenied,
}

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("Source file not found: {0}")]
    SourceNotFound(String),
    #[error("Encoder failed with status {status}: {stderr}")]
    EncoderFailed { status: String, stderr: String },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
    #[error("Transfer failed: {0}")]
    TransferFailed(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    /// Absence of the object is the normal "nothing uploaded yet" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Download failed with status: {0}")]
    BadStatus(reqwest::StatusCode),
    #[error("Download cancelled")]
    Cancelled,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DownloadError {
    pub fn user_message(&self) -> String {
        DOWNLOAD_ERROR_MESSAGE.to_string()
    }
}
