//! vidloader library
//!
//! A launcher plugin that turns a pasted URL into a yt-dlp download. The
//! plugin owns the command line, the tool installation and the error
//! reporting; all media work is done by yt-dlp and ffmpeg.

pub mod database;
pub mod plugin;
pub mod setup;
pub mod utils;
pub mod ytdlp;

// Re-export main types for easier use
pub use plugin::{HostApi, Plugin, PluginAction, PluginContext, QueryResult};
pub use setup::{SetupPhase, ToolInstaller};
pub use utils::{DownloadSettings, SettingsStore, VidloaderError};
