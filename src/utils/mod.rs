//! Utility modules for error handling, configuration and platform glue

pub mod config;
pub mod error;
pub mod folder;
pub mod platform;

// Re-export for convenience
pub use config::{DownloadSettings, SettingValue, SettingsStore};
pub use error::VidloaderError;
pub use folder::FolderOpener;
