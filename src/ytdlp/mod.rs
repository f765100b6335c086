//! yt-dlp integration: argument building, process running, and output
//! interpretation. All media work is delegated to the external tool.

pub mod args;
pub mod builder;
pub mod classifier;
pub mod output;
pub mod runner;

pub use args::{to_tokens, YtDlpArg};
pub use builder::{
    build_download_args, build_formats_args, build_version_args, format_selector, BuildEnv,
    DownloadKind, DownloadRequest,
};
pub use classifier::{classify, ClassifiedError, ErrorCategory};
pub use runner::{ProcessResult, ProcessRunner, RunMode, ToolRunner};
