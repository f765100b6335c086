//! Typed yt-dlp arguments.
//!
//! Arguments stay structured until the process is spawned, where
//! [`to_tokens`] turns them into one token per argv slot. Nothing here goes
//! through a shell, so values are never quoted.

use crate::utils::config::{AudioFormat, VideoFormat};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YtDlpArg {
    /// `-f <selector>`
    Format(String),
    /// `--merge-output-format <fmt>`
    MergeOutputFormat(VideoFormat),
    /// `-x`
    ExtractAudio,
    /// `--audio-format <fmt>`
    AudioFormat(AudioFormat),
    /// `--audio-quality <n>`
    AudioQuality(u8),
    EmbedSubs,
    WriteSubs,
    WriteAutoSubs,
    /// `--sub-langs <codes>`
    SubLangs(String),
    /// `--convert-subs <fmt>`
    ConvertSubs(String),
    SkipDownload,
    EmbedMetadata,
    AddMetadata,
    NoOverwrites,
    RestrictFilenames,
    WindowsFilenames,
    /// `--newline`, one progress line per update
    Newline,
    NoWarnings,
    /// `-F`
    ListFormats,
    Version,
    /// `-o <template>`
    Output(String),
    /// `--ffmpeg-location <dir>`
    FfmpegLocation(PathBuf),
    /// `--cookies <file>`
    Cookies(PathBuf),
    /// Positional URL, always serialised last
    Url(String),
}

impl YtDlpArg {
    fn flag(&self) -> Option<&'static str> {
        let flag = match self {
            YtDlpArg::Format(_) => "-f",
            YtDlpArg::MergeOutputFormat(_) => "--merge-output-format",
            YtDlpArg::ExtractAudio => "-x",
            YtDlpArg::AudioFormat(_) => "--audio-format",
            YtDlpArg::AudioQuality(_) => "--audio-quality",
            YtDlpArg::EmbedSubs => "--embed-subs",
            YtDlpArg::WriteSubs => "--write-subs",
            YtDlpArg::WriteAutoSubs => "--write-auto-subs",
            YtDlpArg::SubLangs(_) => "--sub-langs",
            YtDlpArg::ConvertSubs(_) => "--convert-subs",
            YtDlpArg::SkipDownload => "--skip-download",
            YtDlpArg::EmbedMetadata => "--embed-metadata",
            YtDlpArg::AddMetadata => "--add-metadata",
            YtDlpArg::NoOverwrites => "--no-overwrites",
            YtDlpArg::RestrictFilenames => "--restrict-filenames",
            YtDlpArg::WindowsFilenames => "--windows-filenames",
            YtDlpArg::Newline => "--newline",
            YtDlpArg::NoWarnings => "--no-warnings",
            YtDlpArg::ListFormats => "-F",
            YtDlpArg::Version => "--version",
            YtDlpArg::Output(_) => "-o",
            YtDlpArg::FfmpegLocation(_) => "--ffmpeg-location",
            YtDlpArg::Cookies(_) => "--cookies",
            YtDlpArg::Url(_) => return None,
        };
        Some(flag)
    }

    fn value(&self) -> Option<String> {
        match self {
            YtDlpArg::Format(v)
            | YtDlpArg::SubLangs(v)
            | YtDlpArg::ConvertSubs(v)
            | YtDlpArg::Output(v)
            | YtDlpArg::Url(v) => Some(v.clone()),
            YtDlpArg::MergeOutputFormat(fmt) => Some(fmt.as_str().to_string()),
            YtDlpArg::AudioFormat(fmt) => Some(fmt.as_str().to_string()),
            YtDlpArg::AudioQuality(q) => Some(q.to_string()),
            YtDlpArg::FfmpegLocation(p) | YtDlpArg::Cookies(p) => {
                Some(p.to_string_lossy().into_owned())
            }
            _ => None,
        }
    }

    /// A flag whose value turned out blank is dropped entirely
    fn is_blank(&self) -> bool {
        matches!(self.value(), Some(v) if v.trim().is_empty())
    }
}

/// Serialise arguments into argv tokens: flags in order, URLs last,
/// blank values filtered out.
pub fn to_tokens(args: &[YtDlpArg]) -> Vec<String> {
    let mut tokens = Vec::with_capacity(args.len() * 2);
    let mut urls = Vec::new();

    for arg in args.iter().filter(|arg| !arg.is_blank()) {
        match (arg.flag(), arg.value()) {
            (None, Some(url)) => urls.push(url.trim().to_string()),
            (Some(flag), Some(value)) => {
                tokens.push(flag.to_string());
                tokens.push(value);
            }
            (Some(flag), None) => tokens.push(flag.to_string()),
            (None, None) => {}
        }
    }

    tokens.extend(urls);
    tokens
}

/// Render tokens for logs, quoting the ones containing whitespace
pub fn display_command_line(program: &str, tokens: &[String]) -> String {
    let mut line = quote_for_display(program);
    for token in tokens {
        line.push(' ');
        line.push_str(&quote_for_display(token));
    }
    line
}

fn quote_for_display(token: &str) -> String {
    if token.is_empty() || token.contains(char::is_whitespace) || token.contains('"') {
        format!("\"{}\"", token.replace('"', "\\\""))
    } else {
        token.to_string()
    }
}
