//! Framework-neutral view model of the single screen.

use std::path::PathBuf;

use serde::Serialize;

use super::state::{SessionState, UploadState};
pub use crate::services::DOWNLOAD_ERROR_MESSAGE;

/// What the playback overlay shows in its content area
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OverlayContent {
    Downloading,
    Error { message: String },
    Video { path: PathBuf },
    /// Nothing to show; only the close button is rendered
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenModel {
    pub record_label: &'static str,
    /// The button that opens playback, present only with a downloaded asset
    pub show_button: bool,
    /// Progress text of the upload overlay while an upload runs
    pub upload_overlay: Option<String>,
    /// `None` while the playback overlay is closed
    pub playback: Option<OverlayContent>,
}

impl From<&SessionState> for ScreenModel {
    fn from(state: &SessionState) -> Self {
        let upload_overlay = (state.upload_state == UploadState::Running)
            .then(|| format!("{} %", state.progress.unwrap_or(0)));

        let playback = state.modal_visible.then(|| {
            if state.downloading_file {
                OverlayContent::Downloading
            } else if state.downloading_file_error {
                OverlayContent::Error {
                    message: DOWNLOAD_ERROR_MESSAGE.to_string(),
                }
            } else if let Some(path) = &state.local_path {
                OverlayContent::Video { path: path.clone() }
            } else {
                OverlayContent::Empty
            }
        });

        Self {
            record_label: if state.recording { "STOP" } else { "START" },
            show_button: state.local_path.is_some(),
            upload_overlay,
            playback,
        }
    }
}
