//! Command builder: `(request, settings, env)` to yt-dlp arguments.
//!
//! Everything in here is pure. The only clock reading happens when a
//! [`DownloadRequest`] is created; the builder just formats it.

use crate::utils::config::{DownloadSettings, VideoQuality};
use crate::utils::error::VidloaderError;
use crate::ytdlp::args::YtDlpArg;
use chrono::{DateTime, Local};
use reqwest::Url;
use std::path::PathBuf;

/// Title placeholder, truncated so long titles stay inside path limits
pub const TITLE_PLACEHOLDER: &str = "%(title).80s";
pub const ID_PLACEHOLDER: &str = "%(id)s";
pub const EXT_PLACEHOLDER: &str = "%(ext)s";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// What the user asked to download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    Video(VideoQuality),
    Audio,
    Subtitles,
}

impl DownloadKind {
    pub fn label(&self) -> &'static str {
        match self {
            DownloadKind::Video(_) => "video",
            DownloadKind::Audio => "audio",
            DownloadKind::Subtitles => "subtitles",
        }
    }
}

/// One user action, built from the settings at the moment of invocation
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub kind: DownloadKind,
    pub requested_at: DateTime<Local>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, kind: DownloadKind) -> Self {
        Self {
            url: url.into(),
            kind,
            requested_at: Local::now(),
        }
    }

    /// Format/quality description stored in the download history
    pub fn format_label(&self, settings: &DownloadSettings) -> String {
        match self.kind {
            DownloadKind::Video(quality) => format!("{} {}", quality, settings.video_format),
            DownloadKind::Audio => format!(
                "audio {} q{}",
                settings.audio_format, settings.audio_quality
            ),
            DownloadKind::Subtitles => {
                format!("subtitles {}", settings.subtitle_languages_or_default())
            }
        }
    }
}

/// Facts about the environment the builder may not discover itself
#[derive(Debug, Clone, Default)]
pub struct BuildEnv {
    /// Directory holding a managed ffmpeg, if one is installed
    pub ffmpeg_dir: Option<PathBuf>,
}

/// Format selector for a quality.
///
/// Prefers an mp4 video + m4a audio pair under the height ceiling, then a
/// muxed mp4, then anything under the ceiling.
pub fn format_selector(quality: VideoQuality) -> String {
    match quality.max_height() {
        Some(h) => format!(
            "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best[height<={h}]"
        ),
        None => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
    }
}

/// Selector for a raw quality token; unknown tokens get the `best` selector
pub fn format_selector_for_token(token: &str) -> String {
    format_selector(VideoQuality::from_token_lossy(token))
}

/// Check that a string is an absolute http(s) URL with a host
pub fn is_supported_url(raw: &str) -> bool {
    match Url::parse(raw.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Trimmed URL, or [`VidloaderError::InvalidUrl`] when yt-dlp should not be
/// handed it
pub fn require_supported_url(raw: &str) -> Result<String, VidloaderError> {
    let trimmed = raw.trim();
    if is_supported_url(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(VidloaderError::InvalidUrl(trimmed.to_string()))
    }
}

pub fn is_youtube_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .map(|host| host.ends_with("youtube.com") || host.ends_with("youtu.be"))
        .unwrap_or(false)
}

/// Pull the video id out of well-known YouTube URL shapes
pub fn extract_video_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate: Option<String> = if host == "youtu.be" || host.ends_with(".youtu.be") {
        segments.next().map(str::to_string)
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("shorts") | Some("embed") | Some("live") | Some("v") => {
                segments.next().map(str::to_string)
            }
            _ => None,
        }
    } else {
        None
    };
    let candidate = candidate?;

    let valid = !candidate.is_empty()
        && candidate.len() <= 64
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(candidate)
}

/// Output template relative to the download directory.
///
/// A non-blank custom template wins outright. Otherwise the template is
/// `title[_quality][_id|_timestamp].ext`; with overwrite prevention on it
/// always carries the id or the request timestamp.
pub fn output_template(request: &DownloadRequest, settings: &DownloadSettings) -> String {
    if let Some(custom) = settings.custom_template() {
        return custom.to_string();
    }

    let mut template = String::from(TITLE_PLACEHOLDER);

    if settings.include_quality_in_filename {
        let label = match request.kind {
            DownloadKind::Video(quality) => quality.as_str(),
            DownloadKind::Audio => settings.audio_format.as_str(),
            DownloadKind::Subtitles => "subs",
        };
        template.push_str(&format!("_[{}]", label));
    }

    if settings.include_video_id_in_filename {
        let id = extract_video_id(&request.url).unwrap_or_else(|| ID_PLACEHOLDER.to_string());
        template.push_str(&format!("_[{}]", id));
    } else if settings.prevent_overwrite {
        template.push_str(&format!(
            "_[{}]",
            request.requested_at.format(TIMESTAMP_FORMAT)
        ));
    }

    template.push('.');
    template.push_str(EXT_PLACEHOLDER);
    template
}

/// Full `-o` value: the template joined to the download directory unless
/// the template is already absolute
pub fn output_path(request: &DownloadRequest, settings: &DownloadSettings) -> String {
    let template = output_template(request, settings);
    if PathBuf::from(&template).is_absolute() {
        template
    } else {
        settings
            .download_path
            .join(template)
            .to_string_lossy()
            .into_owned()
    }
}

/// Arguments for a download
pub fn build_download_args(
    request: &DownloadRequest,
    settings: &DownloadSettings,
    env: &BuildEnv,
) -> Vec<YtDlpArg> {
    let mut args = vec![YtDlpArg::Newline];

    match request.kind {
        DownloadKind::Video(quality) => {
            args.push(YtDlpArg::Format(format_selector(quality)));
            args.push(YtDlpArg::MergeOutputFormat(settings.video_format));
            if settings.embed_subtitles {
                args.extend([
                    YtDlpArg::EmbedSubs,
                    YtDlpArg::WriteSubs,
                    YtDlpArg::WriteAutoSubs,
                    YtDlpArg::SubLangs(settings.subtitle_languages_or_default().to_string()),
                ]);
            }
        }
        DownloadKind::Audio => {
            args.extend([
                YtDlpArg::Format("bestaudio".to_string()),
                YtDlpArg::ExtractAudio,
                YtDlpArg::AudioFormat(settings.audio_format),
                YtDlpArg::AudioQuality(settings.audio_quality),
            ]);
        }
        DownloadKind::Subtitles => {
            args.extend([
                YtDlpArg::SkipDownload,
                YtDlpArg::WriteSubs,
                YtDlpArg::WriteAutoSubs,
                YtDlpArg::SubLangs(settings.subtitle_languages_or_default().to_string()),
                YtDlpArg::ConvertSubs("srt".to_string()),
            ]);
        }
    }

    if settings.embed_metadata && request.kind != DownloadKind::Subtitles {
        args.push(YtDlpArg::EmbedMetadata);
        args.push(YtDlpArg::AddMetadata);
    }
    if settings.prevent_overwrite {
        args.push(YtDlpArg::NoOverwrites);
    }
    args.push(YtDlpArg::RestrictFilenames);
    args.push(YtDlpArg::WindowsFilenames);

    if let Some(cookies) = &settings.cookies_file {
        args.push(YtDlpArg::Cookies(cookies.clone()));
    }
    if let Some(dir) = &env.ffmpeg_dir {
        args.push(YtDlpArg::FfmpegLocation(dir.clone()));
    }

    args.push(YtDlpArg::Output(output_path(request, settings)));
    args.push(YtDlpArg::Url(request.url.trim().to_string()));
    args
}

/// Arguments listing the available formats of a video
pub fn build_formats_args(url: &str, settings: &DownloadSettings) -> Vec<YtDlpArg> {
    let mut args = vec![YtDlpArg::ListFormats, YtDlpArg::NoWarnings];
    if let Some(cookies) = &settings.cookies_file {
        args.push(YtDlpArg::Cookies(cookies.clone()));
    }
    args.push(YtDlpArg::Url(url.trim().to_string()));
    args
}

/// Trivial invocation used as a smoke test after installs and updates
pub fn build_version_args() -> Vec<YtDlpArg> {
    vec![YtDlpArg::Version]
}
