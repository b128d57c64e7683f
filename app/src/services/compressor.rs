use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::error::CompressionError;

/// Compression preset applied before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CompressionQuality {
    #[default]
    Low, // 720p, 5 Mbps
    Medium, // 1080p, 8 Mbps
    High,   // Native, 12 Mbps
}

impl CompressionQuality {
    pub fn max_height(self) -> u32 {
        match self {
            CompressionQuality::Low => 720,
            CompressionQuality::Medium => 1080,
            CompressionQuality::High => u32::MAX,
        }
    }

    pub fn bitrate(self) -> u32 {
        match self {
            CompressionQuality::Low => 5_000_000,
            CompressionQuality::Medium => 8_000_000,
            CompressionQuality::High => 12_000_000,
        }
    }
}

/// Re-encodes a captured clip into a smaller file.
#[async_trait::async_trait]
pub trait VideoCompressor: Send + Sync {
    /// Returns the path of the compressed file. The source is left untouched.
    async fn compress(
        &self,
        source: &Path,
        quality: CompressionQuality,
    ) -> Result<PathBuf, CompressionError>;
}

/// Compressor that shells out to an `ffmpeg` binary.
pub struct FfmpegCompressor {
    binary: PathBuf,
    /// Where compressed files go; next to the source when `None`.
    output_dir: Option<PathBuf>,
}

impl FfmpegCompressor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            output_dir: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// `clip.mov` -> `clip_compressed.mov`
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        let file_name = match source.extension() {
            Some(ext) => format!("{}_compressed.{}", stem, ext.to_string_lossy()),
            None => format!("{}_compressed.mp4", stem),
        };

        let dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        dir.join(file_name)
    }

    fn build_args(source: &Path, output: &Path, quality: CompressionQuality) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
        ];

        if quality.max_height() != u32::MAX {
            // Never upscale; keep width even for the encoder
            args.push("-vf".to_string());
            args.push(format!("scale=-2:'min({},ih)'", quality.max_height()));
        }

        args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-b:v".to_string(),
            quality.bitrate().to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            output.to_string_lossy().to_string(),
        ]);
        args
    }
}

impl Default for FfmpegCompressor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait::async_trait]
impl VideoCompressor for FfmpegCompressor {
    async fn compress(
        &self,
        source: &Path,
        quality: CompressionQuality,
    ) -> Result<PathBuf, CompressionError> {
        if !tokio::fs::try_exists(source).await? {
            return Err(CompressionError::SourceNotFound(
                source.display().to_string(),
            ));
        }

        let output = self.output_path(source);
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = Self::build_args(source, &output, quality);
        debug!("Running {:?} {:?}", self.binary, args);

        let result = tokio::process::Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            return Err(CompressionError::EncoderFailed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        info!(
            "Compressed {:?} -> {:?} ({} preset)",
            source, output, quality
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_sits_next_to_source() {
        let compressor = FfmpegCompressor::default();
        assert_eq!(
            compressor.output_path(Path::new("/tmp/clip.mov")),
            PathBuf::from("/tmp/clip_compressed.mov")
        );
    }

    #[test]
    fn test_output_path_uses_output_dir() {
        let compressor = FfmpegCompressor::default().with_output_dir("/var/cache/out");
        assert_eq!(
            compressor.output_path(Path::new("/tmp/clip")),
            PathBuf::from("/var/cache/out/clip_compressed.mp4")
        );
    }

    #[test]
    fn test_low_preset_scales_and_caps_bitrate() {
        let args = FfmpegCompressor::build_args(
            Path::new("in.mov"),
            Path::new("out.mov"),
            CompressionQuality::Low,
        );
        assert!(args.contains(&"scale=-2:'min(720,ih)'".to_string()));
        assert!(args.contains(&"5000000".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("out.mov"));
    }

    #[test]
    fn test_high_preset_keeps_native_resolution() {
        let args = FfmpegCompressor::build_args(
            Path::new("in.mov"),
            Path::new("out.mov"),
            CompressionQuality::High,
        );
        assert!(!args.contains(&"-vf".to_string()));
        assert!(args.contains(&"12000000".to_string()));
    }

    #[tokio::test]
    async fn test_missing_source_is_rejected() {
        let compressor = FfmpegCompressor::new("/nonexistent/ffmpeg");
        let result = compressor
            .compress(Path::new("/nonexistent/clip.mov"), CompressionQuality::Low)
            .await;
        assert!(matches!(result, Err(CompressionError::SourceNotFound(_))));
    }
}
