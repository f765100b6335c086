//! Parsing of yt-dlp stdout

use serde::Serialize;
use std::path::PathBuf;

/// Final file written by a download, if stdout mentions one.
///
/// The merger and audio extractor report after the raw download, so the
/// last destination line wins.
pub fn parse_destination(stdout: &str) -> Option<PathBuf> {
    let mut destination = None;

    for line in stdout.lines().map(str::trim) {
        let found = if let Some(rest) = line.strip_prefix("[Merger] Merging formats into ") {
            Some(rest.trim_matches('"'))
        } else if line.starts_with("[download]") || line.starts_with("[ExtractAudio]") {
            line.split_once("Destination: ")
                .map(|(_, path)| path)
                .or_else(|| {
                    line.strip_prefix("[download] ")
                        .and_then(|rest| rest.strip_suffix(" has already been downloaded"))
                })
        } else {
            None
        };

        if let Some(path) = found.map(str::trim).filter(|p| !p.is_empty()) {
            destination = Some(PathBuf::from(path));
        }
    }

    destination
}

/// What a format row carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamKind {
    Muxed,
    VideoOnly,
    AudioOnly,
}

impl StreamKind {
    pub fn heading(&self) -> &'static str {
        match self {
            StreamKind::Muxed => "Video + audio",
            StreamKind::VideoOnly => "Video only",
            StreamKind::AudioOnly => "Audio only",
        }
    }
}

/// One row of `yt-dlp -F`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatRow {
    pub format_id: String,
    pub ext: String,
    pub resolution: String,
    pub kind: StreamKind,
    pub line: String,
}

/// Parse the format table printed by `yt-dlp -F`.
///
/// Storyboard (`mhtml`) rows are dropped; they cannot be downloaded as media.
pub fn parse_format_listing(stdout: &str) -> Vec<FormatRow> {
    let mut rows = Vec::new();
    let mut in_table = false;

    for line in stdout.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !in_table {
            in_table = trimmed.starts_with("ID") && trimmed.contains("EXT");
            continue;
        }
        if trimmed.chars().all(|c| matches!(c, '-' | '─' | ' ')) {
            continue;
        }

        let mut columns = trimmed.split_whitespace();
        let (Some(format_id), Some(ext)) = (columns.next(), columns.next()) else {
            continue;
        };
        if ext == "mhtml" {
            continue;
        }

        let kind = if trimmed.contains("audio only") {
            StreamKind::AudioOnly
        } else if trimmed.contains("video only") {
            StreamKind::VideoOnly
        } else {
            StreamKind::Muxed
        };
        let resolution = match kind {
            StreamKind::AudioOnly => "audio only".to_string(),
            _ => columns.next().unwrap_or_default().to_string(),
        };

        rows.push(FormatRow {
            format_id: format_id.to_string(),
            ext: ext.to_string(),
            resolution,
            kind,
            line: trimmed.to_string(),
        });
    }

    rows
}

/// Human-readable listing grouped by stream kind
pub fn render_format_listing(rows: &[FormatRow]) -> String {
    if rows.is_empty() {
        return "No format information available.".to_string();
    }

    let mut out = String::new();
    for kind in [StreamKind::Muxed, StreamKind::VideoOnly, StreamKind::AudioOnly] {
        let group: Vec<&FormatRow> = rows.iter().filter(|row| row.kind == kind).collect();
        if group.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("{} ({})\n", kind.heading(), group.len()));
        for row in group {
            out.push_str(&format!(
                "  {:<8} {:<5} {}\n",
                row.format_id, row.ext, row.resolution
            ));
        }
    }
    out
}
