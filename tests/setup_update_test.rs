//! Tool installation and self-update against in-memory fetchers and runners

mod common;

use common::{FakeFetcher, FakeRunner};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use vidloader::setup::{
    InstallOutcome, ReleaseSources, SetupPhase, SetupSlot, ToolInstaller, UpdateOutcome,
};
use vidloader::utils::platform::{tool_file_name, ToolPaths};
use vidloader::utils::VidloaderError;

const YTDLP_URL: &str = "https://releases.test/yt-dlp";
const FFMPEG_URL: &str = "https://releases.test/ffmpeg.zip";

fn ffmpeg_zip() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for tool in ["ffmpeg", "ffprobe"] {
        writer
            .start_file(format!("ffmpeg-build/bin/{}", tool_file_name(tool)), options)
            .unwrap();
        writer.write_all(tool.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn sources(with_ffmpeg: bool) -> ReleaseSources {
    ReleaseSources {
        ytdlp_url: YTDLP_URL.to_string(),
        ffmpeg_archive_url: with_ffmpeg.then(|| FFMPEG_URL.to_string()),
    }
}

fn installer(
    dir: &TempDir,
    sources: ReleaseSources,
    fetcher: Arc<FakeFetcher>,
    runner: Arc<FakeRunner>,
    slot: Arc<SetupSlot>,
) -> ToolInstaller {
    ToolInstaller::new(ToolPaths::new(dir.path()), sources, fetcher, runner, slot).managed_only()
}

/// A plugin dir that already holds both managed tools
fn installed_dir() -> TempDir {
    let dir = tempdir().unwrap();
    let paths = ToolPaths::new(dir.path());
    std::fs::create_dir_all(&paths.bin_dir).unwrap();
    std::fs::write(&paths.ytdlp, b"old-yt-dlp").unwrap();
    std::fs::write(&paths.ffmpeg, b"ffmpeg").unwrap();
    dir
}

fn leftovers(bin_dir: &Path) -> Vec<String> {
    std::fs::read_dir(bin_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".bak") || name.ends_with(".part") || name.ends_with(".zip"))
        .collect()
}

#[tokio::test]
async fn test_failed_smoke_test_restores_backup() {
    let dir = installed_dir();
    let fetcher = Arc::new(FakeFetcher::default().serving(YTDLP_URL, b"broken-yt-dlp".to_vec()));
    let runner = Arc::new(FakeRunner::failing("Illegal instruction"));
    let slot = Arc::new(SetupSlot::new(SetupPhase::Installed));
    let installer = installer(&dir, sources(true), fetcher, runner.clone(), slot);

    let outcome = installer.update_ytdlp().await.unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::RolledBack("Illegal instruction".to_string())
    );
    let paths = installer.paths();
    assert_eq!(std::fs::read(&paths.ytdlp).unwrap(), b"old-yt-dlp");
    assert!(leftovers(&paths.bin_dir).is_empty());
    assert_eq!(installer.phase(), SetupPhase::UpdateFailed);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, paths.ytdlp);
    assert_eq!(calls[0].1, vec!["--version".to_string()]);
}

#[tokio::test]
async fn test_successful_update_replaces_binary() {
    let dir = installed_dir();
    let fetcher = Arc::new(FakeFetcher::default().serving(YTDLP_URL, b"new-yt-dlp".to_vec()));
    let runner = Arc::new(FakeRunner::ok("2024.10.07\n"));
    let slot = Arc::new(SetupSlot::new(SetupPhase::Installed));
    let installer = installer(&dir, sources(true), fetcher, runner, slot);

    let outcome = installer.update_ytdlp().await.unwrap();

    assert_eq!(outcome, UpdateOutcome::Updated("2024.10.07".to_string()));
    assert_eq!(std::fs::read(&installer.paths().ytdlp).unwrap(), b"new-yt-dlp");
    assert!(leftovers(&installer.paths().bin_dir).is_empty());
    assert_eq!(installer.phase(), SetupPhase::Installed);
}

#[tokio::test]
async fn test_failed_download_keeps_current_binary() {
    let dir = installed_dir();
    let fetcher = Arc::new(FakeFetcher::default());
    let runner = Arc::new(FakeRunner::ok("unused"));
    let slot = Arc::new(SetupSlot::new(SetupPhase::Installed));
    let installer = installer(&dir, sources(true), fetcher, runner.clone(), slot);

    let outcome = installer.update_ytdlp().await.unwrap();

    assert!(matches!(outcome, UpdateOutcome::RolledBack(_)));
    assert_eq!(std::fs::read(&installer.paths().ytdlp).unwrap(), b"old-yt-dlp");
    assert!(leftovers(&installer.paths().bin_dir).is_empty());
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_update_without_managed_binary() {
    let dir = tempdir().unwrap();
    let installer = installer(
        &dir,
        sources(true),
        Arc::new(FakeFetcher::default()),
        Arc::new(FakeRunner::ok("")),
        Arc::new(SetupSlot::default()),
    );

    assert!(matches!(
        installer.update_ytdlp().await,
        Err(VidloaderError::YtDlpNotFound)
    ));
    assert_eq!(installer.phase(), SetupPhase::NotInstalled);
}

#[tokio::test]
async fn test_busy_slot_refuses_install_and_update() {
    let dir = installed_dir();
    std::fs::remove_file(ToolPaths::new(dir.path()).ffmpeg).unwrap();

    let slot = Arc::new(SetupSlot::new(SetupPhase::Installed));
    let ticket = slot.try_begin(SetupPhase::Updating).unwrap();
    let fetcher = Arc::new(FakeFetcher::default().serving(YTDLP_URL, b"new".to_vec()));
    let installer = installer(
        &dir,
        sources(true),
        fetcher.clone(),
        Arc::new(FakeRunner::ok("v")),
        slot.clone(),
    );

    assert!(matches!(
        installer.update_ytdlp().await,
        Err(VidloaderError::SetupBusy)
    ));
    assert!(matches!(
        installer.ensure_installed().await,
        Err(VidloaderError::SetupBusy)
    ));
    assert!(fetcher.fetched().is_empty());
    assert_eq!(std::fs::read(&installer.paths().ytdlp).unwrap(), b"old-yt-dlp");

    drop(ticket);
    assert_eq!(slot.phase(), SetupPhase::Installed);
}

#[tokio::test]
async fn test_install_fetches_both_tools() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(
        FakeFetcher::default()
            .serving(YTDLP_URL, b"yt-dlp".to_vec())
            .serving(FFMPEG_URL, ffmpeg_zip()),
    );
    let installer = installer(
        &dir,
        sources(true),
        fetcher.clone(),
        Arc::new(FakeRunner::ok("")),
        Arc::new(SetupSlot::default()),
    );

    let outcome = installer.ensure_installed().await.unwrap();
    assert_eq!(outcome, InstallOutcome::Installed(vec!["yt-dlp", "ffmpeg"]));

    let paths = installer.paths();
    assert_eq!(std::fs::read(&paths.ytdlp).unwrap(), b"yt-dlp");
    assert_eq!(std::fs::read(&paths.ffmpeg).unwrap(), b"ffmpeg");
    assert_eq!(std::fs::read(&paths.ffprobe).unwrap(), b"ffprobe");
    assert!(leftovers(&paths.bin_dir).is_empty());
    assert_eq!(installer.phase(), SetupPhase::Installed);
    assert_eq!(installer.ffmpeg_dir(), Some(paths.bin_dir.clone()));

    assert_eq!(
        installer.ensure_installed().await.unwrap(),
        InstallOutcome::AlreadyInstalled
    );
    assert_eq!(fetcher.fetched().len(), 2);
}

#[tokio::test]
async fn test_failed_install_returns_to_not_installed() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::default().serving(YTDLP_URL, b"yt-dlp".to_vec()));
    let installer = installer(
        &dir,
        sources(true),
        fetcher,
        Arc::new(FakeRunner::ok("")),
        Arc::new(SetupSlot::default()),
    );

    assert!(matches!(
        installer.ensure_installed().await,
        Err(VidloaderError::SetupFailed(_))
    ));
    assert_eq!(installer.phase(), SetupPhase::NotInstalled);
    assert!(leftovers(&installer.paths().bin_dir).is_empty());
    // yt-dlp made it; the next attempt only needs ffmpeg
    assert_eq!(installer.detect().ytdlp, Some(installer.paths().ytdlp.clone()));
    assert_eq!(installer.detect().ffmpeg, None);
}

#[tokio::test]
async fn test_platform_without_ffmpeg_build() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::default().serving(YTDLP_URL, b"yt-dlp".to_vec()));
    let installer = installer(
        &dir,
        sources(false),
        fetcher,
        Arc::new(FakeRunner::ok("")),
        Arc::new(SetupSlot::default()),
    );

    assert!(matches!(
        installer.ensure_installed().await,
        Err(VidloaderError::FfmpegNotFound(_))
    ));
    assert_eq!(installer.phase(), SetupPhase::NotInstalled);
}
