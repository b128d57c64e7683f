//! Session state and the phase derived from it.
//!
//! Phase diagram:
//! ```text
//! Idle ──start──> Recording ──stop──> Uploading ──success──> Downloading ──done──> Ready
//!                                                                                  │  ▲
//!                                                                               [open][close]
//!                                                                                  ▼  │
//!                                                                              PlaybackOpen
//! ```
//!
//! The phase is never stored. It is computed from the flags, which are the
//! single source of truth.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::services::{CapturedMedia, TransferState};

/// Upload phase as shown to the UI. Mirrors whatever the transfer task reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UploadState {
    #[default]
    Idle,
    Running,
    Paused,
    Success,
    Error,
}

impl From<TransferState> for UploadState {
    fn from(state: TransferState) -> Self {
        match state {
            TransferState::Running => UploadState::Running,
            TransferState::Paused => UploadState::Paused,
            TransferState::Success => UploadState::Success,
            TransferState::Error => UploadState::Error,
        }
    }
}

/// Everything the UI needs to render the screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub camera_permission: bool,
    pub microphone_permission: bool,
    pub recording: bool,
    pub captured_video: Option<CapturedMedia>,
    pub upload_state: UploadState,
    /// Only meaningful while `upload_state` is `Running`
    pub progress: Option<u8>,
    /// Set only when the latest download succeeded
    pub local_path: Option<PathBuf>,
    pub downloading_file: bool,
    pub downloading_file_error: bool,
    pub modal_visible: bool,
}

/// Coarse phase of the cycle, derived from [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    Recording,
    Uploading,
    Downloading,
    /// Idle with a playable asset
    Ready,
    PlaybackOpen,
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        if self.modal_visible {
            Phase::PlaybackOpen
        } else if self.recording {
            Phase::Recording
        } else if self.upload_state == UploadState::Running {
            Phase::Uploading
        } else if self.downloading_file {
            Phase::Downloading
        } else if self.local_path.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }

    /// Progress while an upload is running, `None` otherwise
    pub fn upload_progress(&self) -> Option<u8> {
        match self.upload_state {
            UploadState::Running => self.progress,
            _ => None,
        }
    }
}
