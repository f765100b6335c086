//! Maps yt-dlp stderr to a user-facing error category.
//!
//! Categories are tested in a fixed priority order; the first one with a
//! matching (case-insensitive) substring wins.

use std::fmt;

/// Longest stderr excerpt shown for unrecognised failures
pub const MAX_EXCERPT_CHARS: usize = 200;

const MIN_MEANINGFUL_LINE_CHARS: usize = 10;

const GENERIC_FAILURE: &str = "yt-dlp failed without a readable error message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    FileExists,
    Network,
    FormatUnavailable,
    AccessDenied,
    GeoBlocked,
    LiveStream,
    LoginRequired,
    CopyrightRemoved,
    PostProcessing,
    Subtitle,
    Unknown,
}

/// Priority order with the substrings that select each category
const RULES: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::FileExists,
        &["has already been downloaded", "already exists", "file exists"],
    ),
    (
        ErrorCategory::Network,
        &[
            "network",
            "unable to download webpage",
            "connection",
            "timed out",
            "getaddrinfo",
            "name resolution",
            "urlopen error",
            "http error 5",
            "certificate verify failed",
        ],
    ),
    (
        ErrorCategory::FormatUnavailable,
        &[
            "requested format",
            "format is not available",
            "no video formats",
            "format not available",
        ],
    ),
    (
        ErrorCategory::AccessDenied,
        &[
            "private video",
            "video is private",
            "http error 403",
            "forbidden",
            "access denied",
            "members-only",
            "members only",
        ],
    ),
    (
        ErrorCategory::GeoBlocked,
        &[
            "available in your country",
            "geo restrict",
            "geo-restrict",
            "geo restricted",
            "blocked in your",
        ],
    ),
    (
        ErrorCategory::LiveStream,
        &[
            "this live event",
            "is currently live",
            "premieres in",
            "live stream",
            "livestream",
        ],
    ),
    (
        ErrorCategory::LoginRequired,
        &[
            "sign in to",
            "login required",
            "log in to",
            "confirm your age",
            "age-restricted",
            "use --cookies",
        ],
    ),
    (
        ErrorCategory::CopyrightRemoved,
        &[
            "copyright",
            "removed by the uploader",
            "account associated with this video has been terminated",
            "video unavailable",
        ],
    ),
    (
        ErrorCategory::PostProcessing,
        &[
            "postprocessing",
            "post-processing",
            "ffmpeg",
            "ffprobe",
            "conversion failed",
            "merging",
        ],
    ),
    (ErrorCategory::Subtitle, &["subtitle"]),
];

impl ErrorCategory {
    pub fn title(&self) -> &'static str {
        match self {
            ErrorCategory::FileExists => "File already exists",
            ErrorCategory::Network => "Network error",
            ErrorCategory::FormatUnavailable => "Format not available",
            ErrorCategory::AccessDenied => "Access denied",
            ErrorCategory::GeoBlocked => "Not available in your region",
            ErrorCategory::LiveStream => "Live stream",
            ErrorCategory::LoginRequired => "Login required",
            ErrorCategory::CopyrightRemoved => "Video removed",
            ErrorCategory::PostProcessing => "Post-processing failed",
            ErrorCategory::Subtitle => "Subtitle error",
            ErrorCategory::Unknown => "Download failed",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ErrorCategory::FileExists => "The file has already been downloaded.",
            ErrorCategory::Network => "Could not reach the video site.",
            ErrorCategory::FormatUnavailable => {
                "The requested quality or format is not offered for this video."
            }
            ErrorCategory::AccessDenied => "The video is private or access was refused.",
            ErrorCategory::GeoBlocked => "The video is blocked in your country.",
            ErrorCategory::LiveStream => "Live streams and upcoming premieres cannot be downloaded yet.",
            ErrorCategory::LoginRequired => "The site requires you to sign in to watch this video.",
            ErrorCategory::CopyrightRemoved => "The video was removed or is unavailable.",
            ErrorCategory::PostProcessing => "Merging or converting the download failed.",
            ErrorCategory::Subtitle => "Subtitles could not be downloaded.",
            ErrorCategory::Unknown => GENERIC_FAILURE,
        }
    }

    /// Suggested remediation, when there is one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ErrorCategory::FileExists => {
                Some("Disable overwrite prevention or include the video ID in file names.")
            }
            ErrorCategory::Network => Some("Check your internet connection and try again."),
            ErrorCategory::FormatUnavailable => Some("Try a lower quality or 'best'."),
            ErrorCategory::AccessDenied | ErrorCategory::LoginRequired => {
                Some("Set a cookies file exported from a logged-in browser.")
            }
            ErrorCategory::GeoBlocked => Some("Try again from a region where it is available."),
            ErrorCategory::LiveStream => Some("Wait until the stream has ended."),
            ErrorCategory::PostProcessing => {
                Some("Run setup again to reinstall ffmpeg, or pick another format.")
            }
            ErrorCategory::Subtitle => {
                Some("Check the subtitle languages setting or disable embedded subtitles.")
            }
            ErrorCategory::CopyrightRemoved | ErrorCategory::Unknown => None,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A classified failure, ready for a toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub message: String,
    pub hint: Option<&'static str>,
}

impl ClassifiedError {
    /// Toast body: message plus hint on its own line
    pub fn body(&self) -> String {
        match self.hint {
            Some(hint) => format!("{}\n{}", self.message, hint),
            None => self.message.clone(),
        }
    }
}

/// Classify raw stderr text
pub fn classify(stderr: &str) -> ClassifiedError {
    let haystack = stderr.to_lowercase();

    for (category, needles) in RULES {
        if needles.iter().any(|needle| haystack.contains(needle)) {
            return ClassifiedError {
                category: *category,
                message: category.message().to_string(),
                hint: category.hint(),
            };
        }
    }

    ClassifiedError {
        category: ErrorCategory::Unknown,
        message: first_meaningful_line(stderr)
            .map(|line| truncate_chars(line, MAX_EXCERPT_CHARS))
            .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        hint: None,
    }
}

/// First non-blank line that is not a `[extractor]` log line and says
/// something more than a word or two
fn first_meaningful_line(stderr: &str) -> Option<&str> {
    stderr
        .lines()
        .map(str::trim)
        .find(|line| {
            !line.is_empty()
                && !line.starts_with('[')
                && line.chars().count() > MIN_MEANINGFUL_LINE_CHARS
        })
}

fn truncate_chars(line: &str, max: usize) -> String {
    if line.chars().count() <= max {
        return line.to_string();
    }
    let mut truncated: String = line.chars().take(max).collect();
    truncated.push_str("...");
    truncated
}
