//! Error handling for vidloader

use thiserror::Error;

/// Main error type for vidloader
#[derive(Debug, Error)]
pub enum VidloaderError {
    #[error("yt-dlp not found. Run setup or install yt-dlp")]
    YtDlpNotFound,

    #[error("ffmpeg not found: {0}")]
    FfmpegNotFound(String),

    #[error("Tool setup is already running, please wait")]
    SetupBusy,

    #[error("Tool setup failed: {0}")]
    SetupFailed(String),

    #[error("Failed to start yt-dlp: {0}")]
    SpawnFailed(String),

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    #[error("Clipboard error: {0}")]
    ClipboardError(String),
}

impl VidloaderError {
    pub(crate) fn invalid_setting(key: &str, reason: impl Into<String>) -> Self {
        VidloaderError::InvalidSetting {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
