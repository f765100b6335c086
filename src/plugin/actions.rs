//! Launcher-facing result rows and the actions they trigger

use crate::utils::config::VideoQuality;
use crate::ytdlp::builder::DownloadKind;

/// Work the plugin can run in the background
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginAction {
    Download { url: String, kind: DownloadKind },
    ListFormats { url: String },
    InstallTools,
    UpdateYtDlp,
    OpenFolder,
    CopyUrl { url: String },
}

impl PluginAction {
    pub fn video(url: &str, quality: VideoQuality) -> Self {
        PluginAction::Download {
            url: url.to_string(),
            kind: DownloadKind::Video(quality),
        }
    }

    pub fn audio(url: &str) -> Self {
        PluginAction::Download {
            url: url.to_string(),
            kind: DownloadKind::Audio,
        }
    }

    pub fn subtitles(url: &str) -> Self {
        PluginAction::Download {
            url: url.to_string(),
            kind: DownloadKind::Subtitles,
        }
    }
}

/// One row in the launcher result list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub title: String,
    pub subtitle: String,
    /// `None` for purely informative rows
    pub action: Option<PluginAction>,
    /// URL the context menu is built for
    pub context: Option<String>,
}

impl QueryResult {
    pub fn info(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            action: None,
            context: None,
        }
    }

    pub fn with_action(mut self, action: PluginAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_context(mut self, url: &str) -> Self {
        self.context = Some(url.to_string());
        self
    }
}

/// Secondary action offered on a result row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenuItem {
    pub title: String,
    pub action: PluginAction,
}

impl ContextMenuItem {
    pub fn new(title: impl Into<String>, action: PluginAction) -> Self {
        Self {
            title: title.into(),
            action,
        }
    }
}
