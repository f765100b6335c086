//! Launcher plugin surface.
//!
//! The host talks to [`Plugin`] through plain methods: `query` for the
//! result list, `context_menu` for secondary actions, `options` and
//! `update_settings` for the settings page, and `execute` to run an action.
//! Toasts flow back through [`HostApi`]. All long work runs on spawned
//! tokio tasks so the host's query path never blocks.

pub mod actions;
pub mod options;
mod tasks;

pub use actions::{ContextMenuItem, PluginAction, QueryResult};
pub use options::PluginOption;

use crate::database::{DownloadHistory, HistoryEntry, HISTORY_DB_FILE};
use crate::setup::{HttpFetcher, ReleaseSources, SetupPhase, SetupSlot, ToolInstaller};
use crate::utils::config::{DownloadSettings, SettingValue, SettingsStore, VideoQuality};
use crate::utils::folder::FolderOpener;
use crate::utils::platform::{self, ToolPaths};
use crate::ytdlp::builder::is_supported_url;
use crate::ytdlp::runner::{ProcessRunner, ToolRunner};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Number of rows returned by the `history` keyword
pub const HISTORY_QUERY_LIMIT: u32 = 10;

const UPDATE_KEYWORD: &str = "update";
const HISTORY_KEYWORD: &str = "history";

/// Callbacks into the launcher
pub trait HostApi: Send + Sync {
    /// Show a toast notification
    fn show_msg(&self, title: &str, body: &str);
}

/// Directories handed to the plugin by its host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginContext {
    /// Holds managed tools under `bin/` and the history database
    pub plugin_dir: PathBuf,
    pub settings_dir: PathBuf,
}

impl PluginContext {
    /// Platform defaults, each overridable
    pub fn resolve(plugin_dir: Option<PathBuf>, settings_dir: Option<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.unwrap_or_else(platform::plugin_dir),
            settings_dir: settings_dir.unwrap_or_else(platform::settings_dir),
        }
    }
}

pub(crate) struct PluginState {
    host: Arc<dyn HostApi>,
    settings: Mutex<SettingsStore>,
    installer: ToolInstaller,
    runner: Arc<dyn ToolRunner>,
    history: Option<DownloadHistory>,
    folders: FolderOpener,
    /// Set once the first query has kicked off an automatic install
    auto_install_started: AtomicBool,
}

impl PluginState {
    fn settings_store(&self) -> MutexGuard<'_, SettingsStore> {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn settings_snapshot(&self) -> DownloadSettings {
        self.settings_store().snapshot()
    }

    fn toast(&self, title: &str, body: &str) {
        self.host.show_msg(title, body);
    }

    async fn log_history(&self, entry: HistoryEntry) {
        if let Some(history) = &self.history {
            if let Err(e) = history.record(&entry).await {
                warn!("Failed to record download history: {}", e);
            }
        }
    }
}

/// Everything a [`Plugin`] is assembled from
pub struct PluginParts {
    pub host: Arc<dyn HostApi>,
    pub settings: SettingsStore,
    pub installer: ToolInstaller,
    pub runner: Arc<dyn ToolRunner>,
    pub history: Option<DownloadHistory>,
    pub folders: FolderOpener,
}

/// The plugin instance; cheap to clone
#[derive(Clone)]
pub struct Plugin {
    state: Arc<PluginState>,
}

impl Plugin {
    pub fn new(parts: PluginParts) -> Self {
        let plugin = Self {
            state: Arc::new(PluginState {
                host: parts.host,
                settings: Mutex::new(parts.settings),
                installer: parts.installer,
                runner: parts.runner,
                history: parts.history,
                folders: parts.folders,
                auto_install_started: AtomicBool::new(false),
            }),
        };
        let phase = plugin.state.installer.refresh_phase();
        debug!("Plugin ready, tools {}", phase);
        plugin
    }

    /// Load settings, open the history database and wire up the real
    /// process runner and HTTP fetcher.
    ///
    /// A history database that cannot be opened is logged and skipped.
    pub async fn init(context: PluginContext, host: Arc<dyn HostApi>) -> Result<Self> {
        info!(
            "Initializing plugin (plugin dir {}, settings dir {})",
            context.plugin_dir.display(),
            context.settings_dir.display()
        );

        let settings = SettingsStore::load(&context.settings_dir);
        let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner::new());
        let installer = ToolInstaller::new(
            ToolPaths::new(&context.plugin_dir),
            ReleaseSources::for_current_platform(),
            Arc::new(HttpFetcher::new()?),
            Arc::clone(&runner),
            Arc::new(SetupSlot::default()),
        );

        let history = match DownloadHistory::open(&context.plugin_dir.join(HISTORY_DB_FILE)).await {
            Ok(history) => Some(history),
            Err(e) => {
                warn!("Download history disabled: {:#}", e);
                None
            }
        };

        Ok(Self::new(PluginParts {
            host,
            settings,
            installer,
            runner,
            history,
            folders: FolderOpener::new(),
        }))
    }

    pub fn setup_phase(&self) -> SetupPhase {
        self.state.installer.phase()
    }

    pub fn settings(&self) -> DownloadSettings {
        self.state.settings_snapshot()
    }

    pub fn history(&self) -> Option<&DownloadHistory> {
        self.state.history.as_ref()
    }

    /// Result rows for the text typed after the action keyword
    pub async fn query(&self, text: &str) -> Vec<QueryResult> {
        let text = text.trim();

        if text.eq_ignore_ascii_case(UPDATE_KEYWORD) {
            return vec![self.update_item()];
        }
        if text.eq_ignore_ascii_case(HISTORY_KEYWORD) {
            return self.history_items().await;
        }
        if !is_supported_url(text) {
            return vec![QueryResult::info(
                "Enter a valid video URL",
                "Example: https://youtu.be/abc123 or https://example.com/video.mp4",
            )];
        }

        let phase = self.state.installer.refresh_phase();
        if phase.is_busy() {
            return vec![please_wait_item(phase)];
        }
        if !phase.tools_usable() {
            let settings = self.settings();
            if settings.auto_install_tools
                && !self.state.auto_install_started.swap(true, Ordering::SeqCst)
            {
                info!("Tools missing, starting automatic install");
                drop(self.execute(PluginAction::InstallTools));
                return vec![please_wait_item(SetupPhase::Installing)];
            }
            return vec![QueryResult::info(
                "Install yt-dlp and ffmpeg",
                "Required before the first download",
            )
            .with_action(PluginAction::InstallTools)];
        }

        self.download_items(text)
    }

    fn download_items(&self, url: &str) -> Vec<QueryResult> {
        let settings = self.settings();
        let quality = settings.default_video_quality;

        vec![
            QueryResult::info(
                "Download video",
                format!("URL: {} | Quality: {}", url, quality.display_name()),
            )
            .with_action(PluginAction::video(url, quality))
            .with_context(url),
            QueryResult::info(
                "Download audio only",
                format!(
                    "Format: {} | Quality: {}",
                    settings.audio_format, settings.audio_quality
                ),
            )
            .with_action(PluginAction::audio(url))
            .with_context(url),
            QueryResult::info(
                "Download subtitles",
                format!("Languages: {}", settings.subtitle_languages_or_default()),
            )
            .with_action(PluginAction::subtitles(url))
            .with_context(url),
            QueryResult::info("Show available formats", "List every stream yt-dlp can fetch")
                .with_action(PluginAction::ListFormats {
                    url: url.to_string(),
                })
                .with_context(url),
        ]
    }

    fn update_item(&self) -> QueryResult {
        QueryResult::info(
            "Update yt-dlp",
            format!("Tools are {}", self.state.installer.refresh_phase()),
        )
        .with_action(PluginAction::UpdateYtDlp)
    }

    async fn history_items(&self) -> Vec<QueryResult> {
        let Some(history) = &self.state.history else {
            return vec![QueryResult::info("Download history is unavailable", "")];
        };

        match history.last(HISTORY_QUERY_LIMIT).await {
            Ok(entries) if entries.is_empty() => {
                vec![QueryResult::info("No downloads yet", "")]
            }
            Ok(entries) => entries
                .iter()
                .map(|entry| {
                    let detail = match (&entry.file_path, &entry.error_message) {
                        (Some(path), _) => path.display().to_string(),
                        (None, Some(error)) => error.clone(),
                        (None, None) => String::new(),
                    };
                    QueryResult::info(entry.summary(), detail).with_context(&entry.url)
                })
                .collect(),
            Err(e) => {
                warn!("Failed to read download history: {:#}", e);
                vec![QueryResult::info("Download history is unavailable", "")]
            }
        }
    }

    /// Secondary actions for a result carrying `url`
    pub fn context_menu(&self, url: &str) -> Vec<ContextMenuItem> {
        let default_quality = self.settings().default_video_quality;

        let mut items = vec![
            ContextMenuItem::new(
                "Copy URL",
                PluginAction::CopyUrl {
                    url: url.to_string(),
                },
            ),
            ContextMenuItem::new("Open download folder", PluginAction::OpenFolder),
        ];

        for quality in VideoQuality::ALL {
            let marker = if quality == default_quality { "✓ " } else { "" };
            items.push(ContextMenuItem::new(
                format!("{}Download {}", marker, quality.display_name()),
                PluginAction::video(url, quality),
            ));
        }

        items.extend([
            ContextMenuItem::new("Download audio only", PluginAction::audio(url)),
            ContextMenuItem::new("Download subtitles", PluginAction::subtitles(url)),
            ContextMenuItem::new(
                "Show available formats",
                PluginAction::ListFormats {
                    url: url.to_string(),
                },
            ),
            ContextMenuItem::new("Update yt-dlp", PluginAction::UpdateYtDlp),
        ]);
        items
    }

    /// Settings page contents
    pub fn options(&self) -> Vec<PluginOption> {
        options::describe(self.state.settings_store().settings())
    }

    /// Apply settings from the host; rejected values are logged and skipped.
    /// Returns how many updates were accepted.
    pub fn update_settings(&self, updates: &[(String, SettingValue)]) -> usize {
        let mut store = self.state.settings_store();
        let mut accepted = 0;
        for (key, value) in updates {
            if store.apply(key, value) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Run `action` on a background task.
    ///
    /// Must be called from inside a tokio runtime. The handle may be
    /// dropped; the task keeps running.
    pub fn execute(&self, action: PluginAction) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(tasks::run_action(state, action))
    }
}

fn please_wait_item(phase: SetupPhase) -> QueryResult {
    let title = match phase {
        SetupPhase::Updating => "Updating yt-dlp, please wait",
        _ => "Installing yt-dlp and ffmpeg, please wait",
    };
    QueryResult::info(title, "Try again in a moment")
}
