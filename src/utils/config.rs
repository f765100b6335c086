//! Download settings: the flat preference record every other component reads.
//!
//! Values enter the record only through [`DownloadSettings::set`], which checks
//! each value against its allow-list. [`SettingsStore`] wraps the record with
//! its JSON file and saves after every accepted mutation.

use crate::utils::error::VidloaderError;
use crate::utils::platform;
use path_absolutize::Absolutize;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Persisted setting keys, mirrored 1:1 in the JSON file
pub mod keys {
    pub const DOWNLOAD_PATH: &str = "DownloadPath";
    pub const DEFAULT_VIDEO_QUALITY: &str = "DefaultVideoQuality";
    pub const VIDEO_FORMAT: &str = "VideoFormat";
    pub const AUDIO_FORMAT: &str = "AudioFormat";
    pub const AUDIO_QUALITY: &str = "AudioQuality";
    pub const EMBED_SUBTITLES: &str = "EmbedSubtitles";
    pub const EMBED_METADATA: &str = "EmbedMetadata";
    pub const PREVENT_OVERWRITE: &str = "PreventOverwrite";
    pub const INCLUDE_QUALITY_IN_FILENAME: &str = "IncludeQualityInFilename";
    pub const INCLUDE_VIDEO_ID_IN_FILENAME: &str = "IncludeVideoIdInFilename";
    pub const SHOW_NOTIFICATIONS: &str = "ShowNotifications";
    pub const AUTO_OPEN_FOLDER: &str = "AutoOpenFolder";
    pub const SUBTITLE_LANGUAGES: &str = "SubtitleLanguages";
    pub const CUSTOM_FILENAME_TEMPLATE: &str = "CustomFilenameTemplate";
    pub const COOKIES_FILE: &str = "CookiesFile";
    pub const AUTO_INSTALL_TOOLS: &str = "AutoInstallTools";
    pub const REUSE_FOLDER_WINDOW: &str = "ReuseFolderWindow";
}

/// Highest value accepted for `--audio-quality` (0 = best VBR)
pub const MAX_AUDIO_QUALITY: u8 = 4;

const SETTINGS_FILE_NAME: &str = "settings.json";

/// A value arriving from the settings provider or the settings file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Text(String),
    Checkbox(bool),
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Checkbox(value)
    }
}

/// An enum setting backed by a fixed allow-list of lowercase tokens
trait SettingChoice: Copy + 'static {
    const KEY: &'static str;
    fn all() -> &'static [Self];
    fn as_str(&self) -> &'static str;
}

fn parse_choice<T: SettingChoice>(raw: &str) -> Result<T, VidloaderError> {
    let wanted = raw.trim().to_ascii_lowercase();
    T::all()
        .iter()
        .copied()
        .find(|choice| choice.as_str() == wanted)
        .ok_or_else(|| {
            let allowed: Vec<&str> = T::all().iter().map(|c| c.as_str()).collect();
            VidloaderError::invalid_setting(
                T::KEY,
                format!("'{}' is not one of {}", raw, allowed.join(", ")),
            )
        })
}

/// Video quality options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum VideoQuality {
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
    #[default]
    #[serde(rename = "best")]
    Best,
}

impl VideoQuality {
    pub const ALL: [VideoQuality; 5] = [
        VideoQuality::P1080,
        VideoQuality::P720,
        VideoQuality::P480,
        VideoQuality::P360,
        VideoQuality::Best,
    ];

    /// Height ceiling in pixels, `None` for best available
    pub fn max_height(&self) -> Option<u32> {
        match self {
            VideoQuality::P1080 => Some(1080),
            VideoQuality::P720 => Some(720),
            VideoQuality::P480 => Some(480),
            VideoQuality::P360 => Some(360),
            VideoQuality::Best => None,
        }
    }

    /// Get string representation for display
    pub fn display_name(&self) -> &'static str {
        match self {
            VideoQuality::Best => "Best Quality",
            other => other.as_str(),
        }
    }

    /// Parse a quality token, falling back to `Best` for anything unknown
    pub fn from_token_lossy(token: &str) -> Self {
        token.parse().unwrap_or(VideoQuality::Best)
    }

    pub fn as_str(&self) -> &'static str {
        <Self as SettingChoice>::as_str(self)
    }
}

impl SettingChoice for VideoQuality {
    const KEY: &'static str = keys::DEFAULT_VIDEO_QUALITY;

    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn as_str(&self) -> &'static str {
        match self {
            VideoQuality::P1080 => "1080p",
            VideoQuality::P720 => "720p",
            VideoQuality::P480 => "480p",
            VideoQuality::P360 => "360p",
            VideoQuality::Best => "best",
        }
    }
}

impl FromStr for VideoQuality {
    type Err = VidloaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s)
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container used when merging video and audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    #[default]
    Mp4,
    Mkv,
    Webm,
    Avi,
}

impl VideoFormat {
    pub fn as_str(&self) -> &'static str {
        <Self as SettingChoice>::as_str(self)
    }
}

impl SettingChoice for VideoFormat {
    const KEY: &'static str = keys::VIDEO_FORMAT;

    fn all() -> &'static [Self] {
        &[
            VideoFormat::Mp4,
            VideoFormat::Mkv,
            VideoFormat::Webm,
            VideoFormat::Avi,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Mkv => "mkv",
            VideoFormat::Webm => "webm",
            VideoFormat::Avi => "avi",
        }
    }
}

impl FromStr for VideoFormat {
    type Err = VidloaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s)
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target format for audio extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    M4a,
    Flac,
    Opus,
    Wav,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        <Self as SettingChoice>::as_str(self)
    }
}

impl SettingChoice for AudioFormat {
    const KEY: &'static str = keys::AUDIO_FORMAT;

    fn all() -> &'static [Self] {
        &[
            AudioFormat::Mp3,
            AudioFormat::M4a,
            AudioFormat::Flac,
            AudioFormat::Opus,
            AudioFormat::Wav,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = VidloaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Download settings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DownloadSettings {
    /// Download location (absolute, created on demand)
    pub download_path: PathBuf,

    /// Quality used by the default "Download video" action
    pub default_video_quality: VideoQuality,

    /// Merge container for video downloads
    pub video_format: VideoFormat,

    /// Extraction format for audio downloads
    pub audio_format: AudioFormat,

    /// yt-dlp VBR quality, 0 (best) to 4
    pub audio_quality: u8,

    pub embed_subtitles: bool,
    pub embed_metadata: bool,
    pub prevent_overwrite: bool,
    pub include_quality_in_filename: bool,
    pub include_video_id_in_filename: bool,

    /// Toasts plus captured output when on, a visible command window when off
    pub show_notifications: bool,

    pub auto_open_folder: bool,

    /// Comma separated subtitle language codes, e.g. `en,es`
    pub subtitle_languages: String,

    /// Overrides the generated output template when not blank
    pub custom_filename_template: String,

    /// Netscape cookies file passed to yt-dlp for restricted videos
    pub cookies_file: Option<PathBuf>,

    /// Install missing tools on the first query
    pub auto_install_tools: bool,

    /// Skip opening a second file browser window for the same folder
    pub reuse_folder_window: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            download_path: platform::default_download_dir(),
            default_video_quality: VideoQuality::Best,
            video_format: VideoFormat::Mp4,
            audio_format: AudioFormat::Mp3,
            audio_quality: 0,
            embed_subtitles: false,
            embed_metadata: true,
            prevent_overwrite: true,
            include_quality_in_filename: true,
            include_video_id_in_filename: true,
            show_notifications: true,
            auto_open_folder: true,
            subtitle_languages: "en".to_string(),
            custom_filename_template: String::new(),
            cookies_file: None,
            auto_install_tools: true,
            reuse_folder_window: true,
        }
    }
}

impl DownloadSettings {
    /// Validate and apply a single setting.
    ///
    /// On error the record is left untouched.
    pub fn set(&mut self, key: &str, value: &SettingValue) -> Result<(), VidloaderError> {
        match key {
            keys::DOWNLOAD_PATH => self.download_path = parse_download_path(text(key, value)?)?,
            keys::DEFAULT_VIDEO_QUALITY => {
                self.default_video_quality = text(key, value)?.parse()?
            }
            keys::VIDEO_FORMAT => self.video_format = text(key, value)?.parse()?,
            keys::AUDIO_FORMAT => self.audio_format = text(key, value)?.parse()?,
            keys::AUDIO_QUALITY => self.audio_quality = parse_audio_quality(text(key, value)?)?,
            keys::EMBED_SUBTITLES => self.embed_subtitles = flag(key, value)?,
            keys::EMBED_METADATA => self.embed_metadata = flag(key, value)?,
            keys::PREVENT_OVERWRITE => self.prevent_overwrite = flag(key, value)?,
            keys::INCLUDE_QUALITY_IN_FILENAME => self.include_quality_in_filename = flag(key, value)?,
            keys::INCLUDE_VIDEO_ID_IN_FILENAME => {
                self.include_video_id_in_filename = flag(key, value)?
            }
            keys::SHOW_NOTIFICATIONS => self.show_notifications = flag(key, value)?,
            keys::AUTO_OPEN_FOLDER => self.auto_open_folder = flag(key, value)?,
            keys::SUBTITLE_LANGUAGES => {
                self.subtitle_languages = parse_subtitle_languages(text(key, value)?)?
            }
            keys::CUSTOM_FILENAME_TEMPLATE => {
                self.custom_filename_template = parse_custom_template(text(key, value)?)?
            }
            keys::COOKIES_FILE => self.cookies_file = parse_cookies_file(text(key, value)?)?,
            keys::AUTO_INSTALL_TOOLS => self.auto_install_tools = flag(key, value)?,
            keys::REUSE_FOLDER_WINDOW => self.reuse_folder_window = flag(key, value)?,
            _ => return Err(VidloaderError::invalid_setting(key, "unknown setting")),
        }
        Ok(())
    }

    /// Subtitle languages to request, `en` when the setting is blank
    pub fn subtitle_languages_or_default(&self) -> &str {
        let langs = self.subtitle_languages.trim();
        if langs.is_empty() {
            "en"
        } else {
            langs
        }
    }

    /// The custom output template, if one is set
    pub fn custom_template(&self) -> Option<&str> {
        let template = self.custom_filename_template.trim();
        (!template.is_empty()).then_some(template)
    }
}

fn text<'a>(key: &str, value: &'a SettingValue) -> Result<&'a str, VidloaderError> {
    match value {
        SettingValue::Text(text) => Ok(text),
        SettingValue::Checkbox(_) => Err(VidloaderError::invalid_setting(key, "expected text")),
    }
}

fn flag(key: &str, value: &SettingValue) -> Result<bool, VidloaderError> {
    match value {
        SettingValue::Checkbox(checked) => Ok(*checked),
        SettingValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(VidloaderError::invalid_setting(
                key,
                format!("'{}' is not a boolean", other),
            )),
        },
    }
}

fn parse_download_path(raw: &str) -> Result<PathBuf, VidloaderError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(VidloaderError::invalid_setting(
            keys::DOWNLOAD_PATH,
            "path is empty",
        ));
    }
    let absolute = Path::new(raw)
        .absolutize()
        .map_err(|e| VidloaderError::invalid_setting(keys::DOWNLOAD_PATH, e.to_string()))?;
    Ok(absolute.into_owned())
}

fn parse_audio_quality(raw: &str) -> Result<u8, VidloaderError> {
    match raw.trim().parse::<u8>() {
        Ok(quality) if quality <= MAX_AUDIO_QUALITY => Ok(quality),
        _ => Err(VidloaderError::invalid_setting(
            keys::AUDIO_QUALITY,
            format!("'{}' is outside 0..={}", raw, MAX_AUDIO_QUALITY),
        )),
    }
}

fn parse_subtitle_languages(raw: &str) -> Result<String, VidloaderError> {
    let langs: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .collect();

    let valid_code = |code: &&str| {
        code.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '*'))
    };

    if langs.is_empty() || !langs.iter().all(valid_code) {
        return Err(VidloaderError::invalid_setting(
            keys::SUBTITLE_LANGUAGES,
            format!("'{}' is not a comma separated list of language codes", raw),
        ));
    }
    Ok(langs.join(","))
}

fn parse_custom_template(raw: &str) -> Result<String, VidloaderError> {
    if raw.contains(['\n', '\r']) {
        return Err(VidloaderError::invalid_setting(
            keys::CUSTOM_FILENAME_TEMPLATE,
            "template must be a single line",
        ));
    }
    Ok(raw.trim().to_string())
}

fn parse_cookies_file(raw: &str) -> Result<Option<PathBuf>, VidloaderError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let path = PathBuf::from(raw);
    if !path.is_file() {
        return Err(VidloaderError::invalid_setting(
            keys::COOKIES_FILE,
            format!("{} does not exist", path.display()),
        ));
    }
    Ok(Some(path))
}

/// Settings record bound to its JSON file
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: DownloadSettings,
}

impl SettingsStore {
    /// Load settings from `<dir>/settings.json`.
    ///
    /// A missing or unreadable file yields defaults. Each persisted key goes
    /// through the same validation as an update, so one bad value only
    /// resets that key.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(SETTINGS_FILE_NAME);
        let mut settings = DownloadSettings::default();

        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<serde_json::Value>(&content) {
                Ok(serde_json::Value::Object(map)) => {
                    for (key, raw) in map {
                        let value = match raw {
                            serde_json::Value::Bool(b) => SettingValue::Checkbox(b),
                            serde_json::Value::String(s) => SettingValue::Text(s),
                            serde_json::Value::Number(n) => SettingValue::Text(n.to_string()),
                            _ => continue,
                        };
                        if let Err(e) = settings.set(&key, &value) {
                            warn!("Ignoring persisted setting: {}", e);
                        }
                    }
                    info!("Loaded settings from {}", path.display());
                }
                Ok(_) => warn!("Settings file {} is not a JSON object", path.display()),
                Err(e) => warn!("Failed to parse settings file {}: {}", path.display(), e),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, using defaults", path.display());
            }
            Err(e) => warn!("Failed to read settings file {}: {}", path.display(), e),
        }

        Self { path, settings }
    }

    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    /// Snapshot for a background task
    pub fn snapshot(&self) -> DownloadSettings {
        self.settings.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply one update and persist it.
    ///
    /// Rejected values are logged and the previous value is kept; this never
    /// fails towards the caller. Returns whether the value was accepted.
    pub fn apply(&mut self, key: &str, value: &SettingValue) -> bool {
        if let Err(e) = self.settings.set(key, value) {
            warn!("Rejected settings update: {}", e);
            return false;
        }
        debug!("Updated setting {}", key);
        if let Err(e) = self.save() {
            warn!("Failed to save settings to {}: {}", self.path.display(), e);
        }
        true
    }

    /// Write the current record to disk
    pub fn save(&self) -> Result<(), VidloaderError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
