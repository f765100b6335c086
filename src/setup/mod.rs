//! Tool setup: locating, installing and updating yt-dlp and ffmpeg

pub mod installer;
pub mod sources;
pub mod state;

pub use installer::{InstallOutcome, ToolInstaller, ToolStatus, UpdateOutcome};
pub use sources::{ArtifactFetcher, HttpFetcher, ReleaseSources};
pub use state::{SetupPhase, SetupSlot, SetupTicket};
