//! Installation and self-update of the managed yt-dlp and ffmpeg binaries

use crate::setup::sources::{ArtifactFetcher, ReleaseSources};
use crate::setup::state::{SetupPhase, SetupSlot};
use crate::utils::error::VidloaderError;
use crate::utils::platform::{make_executable, tool_file_name, ToolPaths};
use crate::ytdlp::args::to_tokens;
use crate::ytdlp::builder::build_version_args;
use crate::ytdlp::runner::{RunMode, ToolRunner};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const FFMPEG_ARCHIVE_NAME: &str = "ffmpeg-download.zip";

/// Resolved tool binaries; `None` means the tool could not be found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolStatus {
    pub ytdlp: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
}

impl ToolStatus {
    pub fn is_complete(&self) -> bool {
        self.ytdlp.is_some() && self.ffmpeg.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    AlreadyInstalled,
    /// Names of the tools that were fetched
    Installed(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The new binary answered `--version` with this string
    Updated(String),
    /// The update was abandoned and the previous binary restored
    RolledBack(String),
}

/// Installs and updates the tools under the plugin's `bin/` directory
pub struct ToolInstaller {
    paths: ToolPaths,
    sources: ReleaseSources,
    fetcher: Arc<dyn ArtifactFetcher>,
    runner: Arc<dyn ToolRunner>,
    slot: Arc<SetupSlot>,
    use_system_tools: bool,
}

impl ToolInstaller {
    pub fn new(
        paths: ToolPaths,
        sources: ReleaseSources,
        fetcher: Arc<dyn ArtifactFetcher>,
        runner: Arc<dyn ToolRunner>,
        slot: Arc<SetupSlot>,
    ) -> Self {
        Self {
            paths,
            sources,
            fetcher,
            runner,
            slot,
            use_system_tools: true,
        }
    }

    /// Ignore binaries found on PATH and only consider the managed ones
    pub fn managed_only(mut self) -> Self {
        self.use_system_tools = false;
        self
    }

    pub fn paths(&self) -> &ToolPaths {
        &self.paths
    }

    pub fn slot(&self) -> &Arc<SetupSlot> {
        &self.slot
    }

    pub fn phase(&self) -> SetupPhase {
        self.slot.phase()
    }

    /// Locate both tools, preferring the managed copies over PATH
    pub fn detect(&self) -> ToolStatus {
        ToolStatus {
            ytdlp: self.locate(&self.paths.ytdlp, "yt-dlp"),
            ffmpeg: self.locate(&self.paths.ffmpeg, "ffmpeg"),
        }
    }

    fn locate(&self, managed: &Path, tool: &str) -> Option<PathBuf> {
        if managed.is_file() {
            return Some(managed.to_path_buf());
        }
        if self.use_system_tools {
            if let Ok(found) = which::which(tool_file_name(tool)) {
                debug!("Using {} from PATH: {}", tool, found.display());
                return Some(found);
            }
        }
        None
    }

    /// Sync the slot with what is on disk, unless a task owns it
    pub fn refresh_phase(&self) -> SetupPhase {
        let phase = match (self.detect().is_complete(), self.slot.phase()) {
            (true, SetupPhase::UpdateFailed) => SetupPhase::UpdateFailed,
            (true, _) => SetupPhase::Installed,
            (false, _) => SetupPhase::NotInstalled,
        };
        self.slot.settle(phase);
        self.slot.phase()
    }

    /// Directory to pass as `--ffmpeg-location`, when ffmpeg is managed here
    pub fn ffmpeg_dir(&self) -> Option<PathBuf> {
        self.paths
            .ffmpeg
            .is_file()
            .then(|| self.paths.bin_dir.clone())
    }

    /// Fetch whichever tools are missing.
    ///
    /// Returns [`VidloaderError::SetupBusy`] if an install or update is
    /// already running. On failure the phase falls back to what it was.
    pub async fn ensure_installed(&self) -> Result<InstallOutcome, VidloaderError> {
        let status = self.detect();
        if status.is_complete() {
            self.slot.settle(SetupPhase::Installed);
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        let ticket = self.slot.try_begin(SetupPhase::Installing)?;
        info!("Installing missing tools into {}", self.paths.bin_dir.display());

        let mut installed = Vec::new();
        let result = async {
            tokio::fs::create_dir_all(&self.paths.bin_dir).await?;
            if status.ytdlp.is_none() {
                self.install_ytdlp().await?;
                installed.push("yt-dlp");
            }
            if status.ffmpeg.is_none() {
                self.install_ffmpeg().await?;
                installed.push("ffmpeg");
            }
            Ok::<(), VidloaderError>(())
        }
        .await;

        match result {
            Ok(()) if self.detect().is_complete() => {
                ticket.finish(SetupPhase::Installed);
                info!("Installed {}", installed.join(", "));
                Ok(InstallOutcome::Installed(installed))
            }
            Ok(()) => {
                error!("Install finished but tools are still missing");
                Err(VidloaderError::SetupFailed(
                    "tools are still missing after install".to_string(),
                ))
            }
            Err(e) => {
                error!("Tool install failed: {}", e);
                Err(match e {
                    e @ (VidloaderError::SetupFailed(_) | VidloaderError::FfmpegNotFound(_)) => e,
                    other => VidloaderError::SetupFailed(other.to_string()),
                })
            }
        }
    }

    async fn install_ytdlp(&self) -> Result<(), VidloaderError> {
        let partial = partial_path(&self.paths.ytdlp);
        if let Err(e) = self.fetcher.fetch(&self.sources.ytdlp_url, &partial).await {
            remove_quietly(&partial);
            return Err(e);
        }
        make_executable(&partial)?;
        std::fs::rename(&partial, &self.paths.ytdlp)?;
        info!("yt-dlp installed at {}", self.paths.ytdlp.display());
        Ok(())
    }

    async fn install_ffmpeg(&self) -> Result<(), VidloaderError> {
        let Some(url) = self.sources.ffmpeg_archive_url.as_deref() else {
            return Err(VidloaderError::FfmpegNotFound(
                "no prebuilt ffmpeg is published for this platform; install it with your package manager"
                    .to_string(),
            ));
        };

        let archive = self.paths.bin_dir.join(FFMPEG_ARCHIVE_NAME);
        let fetched = self.fetcher.fetch(url, &archive).await;
        let extracted = match fetched {
            Ok(_) => {
                let archive_path = archive.clone();
                let paths = self.paths.clone();
                tokio::task::spawn_blocking(move || extract_ffmpeg(&archive_path, &paths))
                    .await
                    .map_err(|e| VidloaderError::SetupFailed(e.to_string()))
                    .and_then(|inner| inner)
            }
            Err(e) => Err(e),
        };
        remove_quietly(&archive);
        extracted?;

        info!("ffmpeg installed at {}", self.paths.ffmpeg.display());
        Ok(())
    }

    /// Replace the managed yt-dlp with the latest release.
    ///
    /// The current binary is copied to a `.bak` file first. If the fetch
    /// fails or the new binary does not answer `--version`, the backup is
    /// moved back and [`UpdateOutcome::RolledBack`] is returned.
    pub async fn update_ytdlp(&self) -> Result<UpdateOutcome, VidloaderError> {
        if !self.paths.ytdlp.is_file() {
            return Err(match self.locate(&self.paths.ytdlp, "yt-dlp") {
                Some(system) => VidloaderError::SetupFailed(format!(
                    "{} is not managed by vidloader; update it with the tool that installed it",
                    system.display()
                )),
                None => VidloaderError::YtDlpNotFound,
            });
        }

        let ticket = self.slot.try_begin(SetupPhase::Updating)?;
        let exe = self.paths.ytdlp.clone();
        let backup = backup_path(&exe);
        let partial = partial_path(&exe);

        std::fs::copy(&exe, &backup)?;
        debug!("Backed up {} to {}", exe.display(), backup.display());

        if let Err(e) = self.fetcher.fetch(&self.sources.ytdlp_url, &partial).await {
            warn!("yt-dlp update download failed: {}", e);
            remove_quietly(&partial);
            remove_quietly(&backup);
            ticket.finish(SetupPhase::UpdateFailed);
            return Ok(UpdateOutcome::RolledBack(e.to_string()));
        }

        if let Err(e) = make_executable(&partial).and_then(|_| std::fs::rename(&partial, &exe)) {
            warn!("Could not put the new yt-dlp in place: {}", e);
            remove_quietly(&partial);
            restore_backup(&backup, &exe)?;
            ticket.finish(SetupPhase::UpdateFailed);
            return Ok(UpdateOutcome::RolledBack(e.to_string()));
        }

        let check = self
            .runner
            .run(&exe, &to_tokens(&build_version_args()), None, RunMode::Hidden)
            .await;

        if check.success {
            remove_quietly(&backup);
            let version = check.stdout.trim().to_string();
            ticket.finish(SetupPhase::Installed);
            info!("yt-dlp updated to {}", version);
            Ok(UpdateOutcome::Updated(version))
        } else {
            let reason = if check.stderr.trim().is_empty() {
                format!("new yt-dlp exited with {:?}", check.exit_code)
            } else {
                check.stderr.trim().to_string()
            };
            warn!("New yt-dlp failed its version check, rolling back: {}", reason);
            restore_backup(&backup, &exe)?;
            ticket.finish(SetupPhase::UpdateFailed);
            Ok(UpdateOutcome::RolledBack(reason))
        }
    }
}

fn partial_path(target: &Path) -> PathBuf {
    with_suffix(target, "part")
}

fn backup_path(target: &Path) -> PathBuf {
    with_suffix(target, "bak")
}

fn with_suffix(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn restore_backup(backup: &Path, exe: &Path) -> io::Result<()> {
    std::fs::rename(backup, exe)?;
    info!("Restored previous yt-dlp from {}", backup.display());
    Ok(())
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

/// Pull `ffmpeg` (required) and `ffprobe` (if present) out of the archive,
/// wherever they sit in its directory tree
fn extract_ffmpeg(archive: &Path, paths: &ToolPaths) -> Result<(), VidloaderError> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    let wanted = [
        (tool_file_name("ffmpeg"), paths.ffmpeg.as_path()),
        (tool_file_name("ffprobe"), paths.ffprobe.as_path()),
    ];
    let mut found_ffmpeg = false;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        if !entry.is_file() {
            continue;
        }
        let entry_name = entry.name().replace('\\', "/");
        let file_name = entry_name.rsplit('/').next().unwrap_or_default().to_lowercase();

        let Some((name, dest)) = wanted.iter().find(|(name, _)| *name == file_name) else {
            continue;
        };

        let partial = partial_path(dest);
        let mut out = File::create(&partial)?;
        io::copy(&mut entry, &mut out)?;
        drop(out);
        make_executable(&partial)?;
        std::fs::rename(&partial, dest)?;
        debug!("Extracted {} from {}", name, entry_name);

        if *dest == paths.ffmpeg.as_path() {
            found_ffmpeg = true;
        }
    }

    if found_ffmpeg {
        Ok(())
    } else {
        Err(VidloaderError::SetupFailed(
            "ffmpeg archive did not contain an ffmpeg binary".to_string(),
        ))
    }
}
