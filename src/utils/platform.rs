//! Platform-specific utilities for vidloader
//!
//! This module provides cross-platform abstractions for:
//! - Plugin directories (managed tools, settings, history)
//! - Executable naming
//! - Download location defaults

use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "vidloader";

/// Returns the plugin directory, where managed tools live under `bin/`
/// - macOS: ~/Library/Application Support/vidloader
/// - Windows: %APPDATA%\vidloader
/// - Linux: ~/.local/share/vidloader
pub fn plugin_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Returns the per-plugin settings directory
/// - macOS: ~/Library/Application Support/vidloader
/// - Windows: %APPDATA%\vidloader
/// - Linux: ~/.config/vidloader
pub fn settings_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    #[cfg(not(target_os = "linux"))]
    {
        plugin_dir()
    }
}

/// Returns the default download directory
/// - All platforms: ~/Downloads/vidloader
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Platform-specific executable extension
pub fn exe_extension() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        ".exe"
    }
    #[cfg(not(target_os = "windows"))]
    {
        ""
    }
}

/// File name of a tool binary on this platform, e.g. `yt-dlp.exe` on Windows
pub fn tool_file_name(tool: &str) -> String {
    format!("{}{}", tool, exe_extension())
}

/// Locations of the managed tool binaries inside the plugin directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub bin_dir: PathBuf,
    pub ytdlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl ToolPaths {
    pub fn new(plugin_dir: &Path) -> Self {
        let bin_dir = plugin_dir.join("bin");
        Self {
            ytdlp: bin_dir.join(tool_file_name("yt-dlp")),
            ffmpeg: bin_dir.join(tool_file_name("ffmpeg")),
            ffprobe: bin_dir.join(tool_file_name("ffprobe")),
            bin_dir,
        }
    }
}

/// Mark a freshly downloaded binary as executable
pub fn make_executable(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
