use std::path::PathBuf;

use tokio::sync::watch;

use super::state::{SessionState, UploadState};
use crate::services::CapturedMedia;

/// Thread-safe owner of the [`SessionState`].
///
/// Every mutation goes through one of the narrow methods below, so the
/// download and upload invariants are enforced in one place. Subscribers get
/// the new state after every change.
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self { tx }
    }

    /// Snapshot of the current state
    pub fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn is_recording(&self) -> bool {
        self.tx.borrow().recording
    }

    pub fn set_permissions(&self, camera: bool, microphone: bool) {
        self.tx.send_modify(|s| {
            s.camera_permission = camera;
            s.microphone_permission = microphone;
        });
    }

    /// Mark recording as started. Returns `false` (and changes nothing) if a
    /// recording is already in progress.
    pub fn begin_recording(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if s.recording {
                return false;
            }
            s.recording = true;
            true
        })
    }

    pub fn end_recording(&self) {
        self.tx.send_modify(|s| s.recording = false);
    }

    pub fn set_captured(&self, media: CapturedMedia) {
        self.tx.send_modify(|s| s.captured_video = Some(media));
    }

    pub fn captured(&self) -> Option<CapturedMedia> {
        self.tx.borrow().captured_video.clone()
    }

    pub fn begin_upload(&self) {
        self.tx.send_modify(|s| {
            s.upload_state = UploadState::Running;
            s.progress = None;
        });
    }

    /// Store a transfer snapshot as reported, without interpreting the phase
    pub fn record_transfer(&self, state: UploadState, progress: u8) {
        self.tx.send_modify(|s| {
            s.upload_state = state;
            s.progress = Some(progress);
        });
    }

    /// The upload never reached the transfer stage. Progress stays frozen.
    pub fn fail_upload(&self) {
        self.tx.send_modify(|s| s.upload_state = UploadState::Error);
    }

    pub fn begin_download(&self) {
        self.tx.send_modify(|s| {
            s.downloading_file = true;
            s.downloading_file_error = false;
        });
    }

    pub fn finish_download(&self, path: PathBuf) {
        self.tx.send_modify(|s| {
            s.downloading_file = false;
            s.downloading_file_error = false;
            s.local_path = Some(path);
        });
    }

    pub fn fail_download(&self) {
        self.tx.send_modify(|s| {
            s.downloading_file = false;
            s.downloading_file_error = true;
            s.local_path = None;
        });
    }

    /// The download was interrupted without an outcome; the previous asset
    /// and error flag are left as they were.
    pub fn abandon_download(&self) {
        self.tx.send_modify(|s| s.downloading_file = false);
    }

    /// Nothing is uploaded yet; not an error. Any superseded download has
    /// been cancelled by the caller, so nothing is in flight any more.
    pub fn clear_asset(&self) {
        self.tx.send_modify(|s| {
            s.local_path = None;
            s.downloading_file = false;
        });
    }

    pub fn set_modal_visible(&self, visible: bool) {
        self.tx.send_modify(|s| s.modal_visible = visible);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
