//! End-to-end plugin flows with the process runner, fetcher and host faked out

mod common;

use common::{FakeFetcher, FakeRunner, RecordingHost};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use vidloader::database::{DownloadHistory, HISTORY_DB_FILE};
use vidloader::plugin::{Plugin, PluginAction, PluginParts};
use vidloader::setup::{ReleaseSources, SetupPhase, SetupSlot, ToolInstaller};
use vidloader::utils::config::{keys, SettingValue, SettingsStore, VideoQuality};
use vidloader::utils::platform::{tool_file_name, ToolPaths};
use vidloader::utils::FolderOpener;
use vidloader::ytdlp::builder::DownloadKind;
use vidloader::ytdlp::ProcessResult;

const URL: &str = "https://youtu.be/abc123";

struct Harness {
    dir: TempDir,
    plugin: Plugin,
    host: Arc<RecordingHost>,
    runner: Arc<FakeRunner>,
    fetcher: Arc<FakeFetcher>,
    folders_opened: Arc<AtomicUsize>,
}

impl Harness {
    fn download_dir(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }
}

fn install_tools(dir: &TempDir) {
    let paths = ToolPaths::new(dir.path());
    std::fs::create_dir_all(&paths.bin_dir).unwrap();
    std::fs::write(&paths.ytdlp, b"yt-dlp").unwrap();
    std::fs::write(&paths.ffmpeg, b"ffmpeg").unwrap();
}

async fn harness(
    dir: TempDir,
    runner: FakeRunner,
    fetcher: FakeFetcher,
    settings: &[(&str, SettingValue)],
) -> Harness {
    let host = Arc::new(RecordingHost::default());
    let runner = Arc::new(runner);
    let fetcher = Arc::new(fetcher);

    let mut store = SettingsStore::load(&dir.path().join("settings"));
    let download_dir = dir.path().join("downloads");
    assert!(store.apply(
        keys::DOWNLOAD_PATH,
        &SettingValue::Text(download_dir.to_string_lossy().into_owned())
    ));
    for (key, value) in settings {
        assert!(store.apply(key, value), "{} rejected", key);
    }

    let installer = ToolInstaller::new(
        ToolPaths::new(dir.path()),
        ReleaseSources {
            ytdlp_url: "https://releases.test/yt-dlp".to_string(),
            ffmpeg_archive_url: Some("https://releases.test/ffmpeg.zip".to_string()),
        },
        fetcher.clone(),
        runner.clone(),
        Arc::new(SetupSlot::default()),
    )
    .managed_only();

    let history = DownloadHistory::open(&dir.path().join(HISTORY_DB_FILE))
        .await
        .unwrap();

    let folders_opened = Arc::new(AtomicUsize::new(0));
    let counter = folders_opened.clone();
    let folders = FolderOpener::with_launcher(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let plugin = Plugin::new(PluginParts {
        host: host.clone(),
        settings: store,
        installer,
        runner: runner.clone(),
        history: Some(history),
        folders,
    });

    Harness {
        dir,
        plugin,
        host,
        runner,
        fetcher,
        folders_opened,
    }
}

async fn installed_harness(runner: FakeRunner) -> Harness {
    let dir = tempdir().unwrap();
    install_tools(&dir);
    harness(dir, runner, FakeFetcher::default(), &[]).await
}

#[tokio::test]
async fn test_invalid_text_gives_hint_row() {
    let h = installed_harness(FakeRunner::ok("")).await;

    for text in ["", "   ", "not a url", "ftp://example.com/a.mp4"] {
        let results = h.plugin.query(text).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Enter a valid video URL");
        assert!(results[0].action.is_none());
    }
}

#[tokio::test]
async fn test_valid_url_offers_download_actions() {
    let dir = tempdir().unwrap();
    install_tools(&dir);
    let h = harness(
        dir,
        FakeRunner::ok(""),
        FakeFetcher::default(),
        &[(keys::DEFAULT_VIDEO_QUALITY, "720p".into())],
    )
    .await;

    let results = h.plugin.query(&format!("  {}  ", URL)).await;
    assert_eq!(results.len(), 4);
    assert_eq!(
        results[0].action,
        Some(PluginAction::video(URL, VideoQuality::P720))
    );
    assert!(results[0].subtitle.contains("720p"));
    assert_eq!(results[1].action, Some(PluginAction::audio(URL)));
    assert_eq!(results[2].action, Some(PluginAction::subtitles(URL)));
    assert_eq!(
        results[3].action,
        Some(PluginAction::ListFormats {
            url: URL.to_string()
        })
    );
    assert!(results.iter().all(|r| r.context.as_deref() == Some(URL)));
}

#[tokio::test]
async fn test_missing_tools_without_auto_install() {
    let h = harness(
        tempdir().unwrap(),
        FakeRunner::ok(""),
        FakeFetcher::default(),
        &[(keys::AUTO_INSTALL_TOOLS, false.into())],
    )
    .await;

    let results = h.plugin.query(URL).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].action, Some(PluginAction::InstallTools));
    assert_eq!(h.plugin.setup_phase(), SetupPhase::NotInstalled);
}

#[tokio::test]
async fn test_missing_tools_trigger_background_install() {
    let fetcher = FakeFetcher::default()
        .serving("https://releases.test/yt-dlp", b"yt-dlp".to_vec())
        .serving("https://releases.test/ffmpeg.zip", ffmpeg_zip());
    let h = harness(tempdir().unwrap(), FakeRunner::ok(""), fetcher, &[]).await;

    let results = h.plugin.query(URL).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].title.contains("please wait"));
    assert!(results[0].action.is_none());

    let mut waited = Duration::ZERO;
    while !h.host.titles().iter().any(|t| t == "Setup complete") {
        assert!(waited < Duration::from_secs(10), "install never finished");
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }

    assert_eq!(h.plugin.setup_phase(), SetupPhase::Installed);
    assert_eq!(h.plugin.query(URL).await.len(), 4);
}

#[tokio::test]
async fn test_failed_auto_install_is_not_retried_per_query() {
    let h = harness(tempdir().unwrap(), FakeRunner::ok(""), FakeFetcher::default(), &[]).await;

    let first = h.plugin.query(URL).await;
    assert!(first[0].title.contains("please wait"));

    let mut waited = Duration::ZERO;
    while !h.host.titles().iter().any(|t| t == "Setup failed") {
        assert!(waited < Duration::from_secs(10), "install never finished");
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }

    for _ in 0..4 {
        let results = h.plugin.query(URL).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].action, Some(PluginAction::InstallTools));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(h.fetcher.fetched().len(), 1);
    assert_eq!(h.host.titles(), vec!["Setup failed".to_string()]);
    assert_eq!(h.plugin.setup_phase(), SetupPhase::NotInstalled);
}

#[tokio::test]
async fn test_successful_download_logs_and_opens_folder() {
    let h = installed_harness(FakeRunner::ok(
        "[download] Destination: /dl/Clip_[best]_[abc123].f137.mp4\n\
         [Merger] Merging formats into \"/dl/Clip_[best]_[abc123].mp4\"\n",
    ))
    .await;

    h.plugin.execute(PluginAction::video(URL, VideoQuality::Best)).await.unwrap();

    let titles = h.host.titles();
    assert_eq!(titles, vec!["Download started", "Download complete!"]);
    assert!(h.download_dir().is_dir());
    assert_eq!(h.folders_opened.load(Ordering::SeqCst), 1);

    let calls = h.runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, ToolPaths::new(h.dir.path()).ytdlp);
    assert_eq!(calls[0].1.last().map(String::as_str), Some(URL));
    let ffmpeg = calls[0].1.iter().position(|t| t == "--ffmpeg-location").unwrap();
    assert_eq!(PathBuf::from(&calls[0].1[ffmpeg + 1]), ToolPaths::new(h.dir.path()).bin_dir);

    let entries = h.plugin.history().unwrap().last(5).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].success);
    assert_eq!(
        entries[0].file_path,
        Some(PathBuf::from("/dl/Clip_[best]_[abc123].mp4"))
    );

    // a second download inside the reuse window does not open another window
    h.plugin.execute(PluginAction::audio(URL)).await.unwrap();
    assert_eq!(h.folders_opened.load(Ordering::SeqCst), 1);
    assert_eq!(h.plugin.history().unwrap().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_failed_download_is_classified() {
    let h = installed_harness(FakeRunner::failing(
        "ERROR: [youtube] abc123: Private video. Sign in if you've been granted access to this video",
    ))
    .await;

    h.plugin
        .execute(PluginAction::Download {
            url: URL.to_string(),
            kind: DownloadKind::Subtitles,
        })
        .await
        .unwrap();

    let messages = h.host.messages();
    let (title, body) = messages.last().unwrap();
    assert_eq!(title, "Access denied");
    assert!(body.contains("cookies"));
    assert_eq!(h.folders_opened.load(Ordering::SeqCst), 0);

    let entries = h.plugin.history().unwrap().last(1).await.unwrap();
    assert!(!entries[0].success);
    assert_eq!(entries[0].format, "subtitles en");
}

#[tokio::test]
async fn test_killed_download_is_not_reported_as_start_failure() {
    let h = installed_harness(FakeRunner::answering(ProcessResult {
        success: false,
        exit_code: None,
        ..Default::default()
    }))
    .await;

    h.plugin
        .execute(PluginAction::Download {
            url: URL.to_string(),
            kind: DownloadKind::Audio,
        })
        .await
        .unwrap();

    let messages = h.host.messages();
    let (title, body) = messages.last().unwrap();
    assert_eq!(title, "Download failed");
    assert!(!body.contains("Failed to start"), "{}", body);
    assert!(body.contains("without a readable error message"));
}

#[tokio::test]
async fn test_format_listing_is_grouped() {
    let listing = "\
ID  EXT   RESOLUTION FPS CH |   FILESIZE   TBR PROTO | VCODEC
-----------------------------------------------------------
140 m4a   audio only      2 |    3.27MiB  130k https | audio only
18  mp4   640x360     30  2 |   10.31MiB  410k https | avc1.42001E
";
    let h = installed_harness(FakeRunner::ok(listing)).await;

    h.plugin
        .execute(PluginAction::ListFormats {
            url: URL.to_string(),
        })
        .await
        .unwrap();

    let messages = h.host.messages();
    let (title, body) = messages.last().unwrap();
    assert_eq!(title, "Available formats");
    assert!(body.find("Video + audio (1)").unwrap() < body.find("Audio only (1)").unwrap());
    assert_eq!(h.runner.calls()[0].1[0], "-F");
}

#[tokio::test]
async fn test_update_settings_skips_rejected_values() {
    let h = installed_harness(FakeRunner::ok("")).await;

    let accepted = h.plugin.update_settings(&[
        (keys::AUDIO_QUALITY.to_string(), "9".into()),
        (keys::VIDEO_FORMAT.to_string(), "mkv".into()),
        (keys::VIDEO_FORMAT.to_string(), "mov".into()),
    ]);

    assert_eq!(accepted, 1);
    let settings = h.plugin.settings();
    assert_eq!(settings.audio_quality, 0);
    assert_eq!(settings.video_format.as_str(), "mkv");

    let option = h
        .plugin
        .options()
        .into_iter()
        .find(|o| o.key == keys::VIDEO_FORMAT)
        .unwrap();
    assert_eq!(option.value, SettingValue::Text("mkv".to_string()));
}

#[tokio::test]
async fn test_context_menu_marks_default_quality() {
    let h = installed_harness(FakeRunner::ok("")).await;
    let items = h.plugin.context_menu(URL);

    assert_eq!(
        items[0].action,
        PluginAction::CopyUrl {
            url: URL.to_string()
        }
    );
    assert_eq!(items[1].action, PluginAction::OpenFolder);

    let marked: Vec<&str> = items
        .iter()
        .filter(|item| item.title.starts_with('✓'))
        .map(|item| item.title.as_str())
        .collect();
    assert_eq!(marked.len(), 1);
    assert!(marked[0].contains(VideoQuality::Best.display_name()));
    assert!(items.iter().any(|item| item.action == PluginAction::UpdateYtDlp));
}

#[tokio::test]
async fn test_history_and_update_keywords() {
    let h = installed_harness(FakeRunner::ok("")).await;

    let empty = h.plugin.query("history").await;
    assert_eq!(empty[0].title, "No downloads yet");

    h.plugin.execute(PluginAction::audio(URL)).await.unwrap();
    let rows = h.plugin.query("HISTORY").await;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].title.contains(URL));
    assert_eq!(rows[0].context.as_deref(), Some(URL));

    let update = h.plugin.query("update").await;
    assert_eq!(update[0].action, Some(PluginAction::UpdateYtDlp));
}

fn ffmpeg_zip() -> Vec<u8> {
    use std::io::Write;

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file(
            format!("bin/{}", tool_file_name("ffmpeg")),
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
    writer.write_all(b"ffmpeg").unwrap();
    writer.finish().unwrap().into_inner()
}
