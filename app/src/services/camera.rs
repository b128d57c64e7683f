use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Options passed to the camera when a clip starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOptions {
    /// Encoder quality hint in `0.0..=1.0`; `None` lets the camera decide.
    pub quality: Option<f32>,
    /// Stop automatically after this long.
    #[serde(default, with = "optional_millis")]
    pub max_duration: Option<Duration>,
    /// Record without an audio track.
    #[serde(default)]
    pub mute: bool,
}

/// Descriptor of a finished clip as delivered by the camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedMedia {
    /// Local file holding the clip.
    pub uri: PathBuf,
    pub codec: Option<String>,
    /// The OS interrupted the clip (call, backgrounding) before stop was requested.
    #[serde(default)]
    pub is_recording_interrupted: bool,
}

impl CapturedMedia {
    pub fn new(uri: impl Into<PathBuf>) -> Self {
        Self {
            uri: uri.into(),
            codec: None,
            is_recording_interrupted: false,
        }
    }
}

/// Device camera in video mode.
///
/// `record` resolves only when the clip ends, either because `stop_recording`
/// was called or because the camera ended it (max duration, interruption).
#[async_trait::async_trait]
pub trait CameraDevice: Send + Sync {
    async fn record(&self, options: RecordOptions) -> Result<CapturedMedia, CaptureError>;

    /// Ask the camera to end the current clip. Safe to call when idle.
    async fn stop_recording(&self);
}

mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
