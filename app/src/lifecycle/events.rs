//! Events emitted by the lifecycle controller.
//!
//! Hosts subscribe through a broadcast channel; emission never fails the
//! operation that produced the event.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::UploadState;

/// Single event stream for everything the controller does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LifecycleEvent {
    /// Permission prompts have been answered
    PermissionsResolved { camera: bool, microphone: bool },
    /// Camera started recording
    RecordingStarted,
    /// Stop was requested; the clip is delivered asynchronously
    RecordingStopped,
    /// The camera delivered a finished clip
    Captured { uri: PathBuf },
    /// The camera failed; the recording flag is left as it was
    CaptureFailed { message: String },
    /// Compression and upload of a clip began
    UploadStarted { upload_id: Uuid },
    /// The transfer task reported a state change
    UploadProgress {
        upload_id: Uuid,
        state: UploadState,
        progress: u8,
    },
    /// Compression or transfer setup failed
    UploadFailed { upload_id: Uuid, message: String },
    /// Fetching the asset began
    DownloadStarted { url: String },
    /// The asset is on disk and playable
    DownloadFinished { path: PathBuf },
    /// Fetching the asset failed
    DownloadFailed {
        /// Technical error message for debugging
        message: String,
        /// User-friendly error message
        user_message: String,
    },
    /// The storage slot is empty
    AssetMissing,
    /// The playback overlay was opened or closed
    PlaybackToggled { visible: bool },
}
