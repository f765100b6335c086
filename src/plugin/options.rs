//! Settings provider: the flat option list shown in the host's settings page

use crate::utils::config::{keys, DownloadSettings, SettingValue, VideoQuality, MAX_AUDIO_QUALITY};

/// One editable setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOption {
    pub key: &'static str,
    pub label: &'static str,
    pub description: String,
    pub value: SettingValue,
}

fn text(key: &'static str, label: &'static str, description: impl Into<String>, value: String) -> PluginOption {
    PluginOption {
        key,
        label,
        description: description.into(),
        value: SettingValue::Text(value),
    }
}

fn checkbox(key: &'static str, label: &'static str, description: &str, value: bool) -> PluginOption {
    PluginOption {
        key,
        label,
        description: description.to_string(),
        value: SettingValue::Checkbox(value),
    }
}

/// Current settings as host options
pub fn describe(settings: &DownloadSettings) -> Vec<PluginOption> {
    let qualities: Vec<&str> = VideoQuality::ALL.iter().map(|q| q.as_str()).collect();

    vec![
        text(
            keys::DOWNLOAD_PATH,
            "Download folder",
            "Where downloaded files are saved",
            settings.download_path.to_string_lossy().into_owned(),
        ),
        text(
            keys::DEFAULT_VIDEO_QUALITY,
            "Default video quality",
            format!("One of: {}", qualities.join(", ")),
            settings.default_video_quality.as_str().to_string(),
        ),
        text(
            keys::VIDEO_FORMAT,
            "Video format",
            "mp4, mkv, webm or avi",
            settings.video_format.as_str().to_string(),
        ),
        text(
            keys::AUDIO_FORMAT,
            "Audio format",
            "mp3, m4a, flac, opus or wav",
            settings.audio_format.as_str().to_string(),
        ),
        text(
            keys::AUDIO_QUALITY,
            "Audio quality",
            format!("0 (best) to {}", MAX_AUDIO_QUALITY),
            settings.audio_quality.to_string(),
        ),
        checkbox(
            keys::EMBED_SUBTITLES,
            "Embed subtitles",
            "Download and embed subtitles into videos",
            settings.embed_subtitles,
        ),
        checkbox(
            keys::EMBED_METADATA,
            "Embed metadata",
            "Write title, uploader and date into the file",
            settings.embed_metadata,
        ),
        checkbox(
            keys::PREVENT_OVERWRITE,
            "Prevent overwrites",
            "Never replace an existing file",
            settings.prevent_overwrite,
        ),
        checkbox(
            keys::INCLUDE_QUALITY_IN_FILENAME,
            "Quality in file name",
            "Append the quality to file names",
            settings.include_quality_in_filename,
        ),
        checkbox(
            keys::INCLUDE_VIDEO_ID_IN_FILENAME,
            "Video ID in file name",
            "Append the video ID to file names",
            settings.include_video_id_in_filename,
        ),
        checkbox(
            keys::SHOW_NOTIFICATIONS,
            "Show notifications",
            "Toast progress; when off, yt-dlp runs in a visible window",
            settings.show_notifications,
        ),
        checkbox(
            keys::AUTO_OPEN_FOLDER,
            "Open folder when done",
            "Open the download folder after a successful download",
            settings.auto_open_folder,
        ),
        text(
            keys::SUBTITLE_LANGUAGES,
            "Subtitle languages",
            "Comma separated language codes, e.g. en,es",
            settings.subtitle_languages.clone(),
        ),
        text(
            keys::CUSTOM_FILENAME_TEMPLATE,
            "Custom file name template",
            "yt-dlp output template; leave blank for the default",
            settings.custom_filename_template.clone(),
        ),
        text(
            keys::COOKIES_FILE,
            "Cookies file",
            "Netscape cookies.txt for private or age-restricted videos",
            settings
                .cookies_file
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ),
        checkbox(
            keys::AUTO_INSTALL_TOOLS,
            "Install tools automatically",
            "Fetch yt-dlp and ffmpeg on first use",
            settings.auto_install_tools,
        ),
        checkbox(
            keys::REUSE_FOLDER_WINDOW,
            "Reuse folder window",
            "Do not reopen a folder opened in the last five minutes",
            settings.reuse_folder_window,
        ),
    ]
}
