//! Bodies of the background tasks started by [`super::Plugin::execute`].
//!
//! Nothing here returns an error: every failure ends in a toast and a log
//! line, so a task can never take the host down.

use super::actions::PluginAction;
use super::PluginState;
use crate::database::HistoryEntry;
use crate::setup::{InstallOutcome, UpdateOutcome};
use crate::utils::error::VidloaderError;
use crate::utils::folder::OpenOutcome;
use crate::ytdlp::args::to_tokens;
use crate::ytdlp::builder::{build_download_args, build_formats_args, BuildEnv, DownloadKind, DownloadRequest};
use crate::ytdlp::classifier::classify;
use crate::ytdlp::output::{parse_destination, parse_format_listing, render_format_listing};
use crate::ytdlp::runner::RunMode;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub(super) async fn run_action(state: Arc<PluginState>, action: PluginAction) {
    debug!("Executing {:?}", action);
    match action {
        PluginAction::Download { url, kind } => download(&state, &url, kind).await,
        PluginAction::ListFormats { url } => list_formats(&state, &url).await,
        PluginAction::InstallTools => install(&state).await,
        PluginAction::UpdateYtDlp => update(&state).await,
        PluginAction::OpenFolder => {
            let settings = state.settings_snapshot();
            open_folder(&state, &settings.download_path, settings.reuse_folder_window);
        }
        PluginAction::CopyUrl { url } => copy_url(&state, &url),
    }
}

async fn download(state: &PluginState, url: &str, kind: DownloadKind) {
    let settings = state.settings_snapshot();
    let request = DownloadRequest::new(url, kind);
    let format_label = request.format_label(&settings);

    let Some(ytdlp) = state.installer.detect().ytdlp else {
        state.toast("Download failed", &VidloaderError::YtDlpNotFound.to_string());
        return;
    };

    if settings.show_notifications {
        state.toast(
            "Download started",
            &format!("Downloading {} from: {}", kind.label(), url),
        );
    }

    if let Err(e) = tokio::fs::create_dir_all(&settings.download_path).await {
        error!(
            "Cannot create download folder {}: {}",
            settings.download_path.display(),
            e
        );
        state.toast("Download failed", &format!("Cannot create download folder: {}", e));
        state
            .log_history(HistoryEntry::failed(url, &format_label, &e.to_string()))
            .await;
        return;
    }

    let env = BuildEnv {
        ffmpeg_dir: state.installer.ffmpeg_dir(),
    };
    let tokens = to_tokens(&build_download_args(&request, &settings, &env));
    let mode = if settings.show_notifications {
        RunMode::Hidden
    } else {
        RunMode::Visible
    };

    info!("Downloading {} ({})", url, format_label);
    let result = state
        .runner
        .run(&ytdlp, &tokens, Some(&settings.download_path), mode)
        .await;

    if result.success {
        let file = parse_destination(&result.stdout);
        info!("Download finished: {}", url);
        if settings.show_notifications {
            let saved_to = file
                .as_deref()
                .unwrap_or(settings.download_path.as_path())
                .display()
                .to_string();
            state.toast("Download complete!", &format!("Saved to {}", saved_to));
        }
        state
            .log_history(HistoryEntry::succeeded(url, file, &format_label))
            .await;
        if settings.auto_open_folder {
            open_folder(state, &settings.download_path, settings.reuse_folder_window);
        }
    } else if let Some(spawn_error) = &result.spawn_error {
        let failure = VidloaderError::SpawnFailed(spawn_error.clone());
        error!("{}", failure);
        state.toast("Download failed", &failure.to_string());
        state
            .log_history(HistoryEntry::failed(url, &format_label, &failure.to_string()))
            .await;
    } else {
        let classified = classify(&result.stderr);
        warn!("Download of {} failed: {}", url, classified.category);
        state.toast(classified.category.title(), &classified.body());
        state
            .log_history(HistoryEntry::failed(url, &format_label, &classified.message))
            .await;
    }
}

async fn list_formats(state: &PluginState, url: &str) {
    let settings = state.settings_snapshot();
    let Some(ytdlp) = state.installer.detect().ytdlp else {
        state.toast("Formats unavailable", &VidloaderError::YtDlpNotFound.to_string());
        return;
    };

    let tokens = to_tokens(&build_formats_args(url, &settings));
    let result = state.runner.run(&ytdlp, &tokens, None, RunMode::Hidden).await;

    if result.success {
        let rows = parse_format_listing(&result.stdout);
        debug!("{} formats listed for {}", rows.len(), url);
        state.toast("Available formats", &render_format_listing(&rows));
    } else if let Some(spawn_error) = result.spawn_error {
        state.toast(
            "Formats unavailable",
            &VidloaderError::SpawnFailed(spawn_error).to_string(),
        );
    } else {
        let classified = classify(&result.stderr);
        state.toast(classified.category.title(), &classified.body());
    }
}

async fn install(state: &PluginState) {
    match state.installer.ensure_installed().await {
        Ok(InstallOutcome::AlreadyInstalled) => {
            state.toast("Tools ready", "yt-dlp and ffmpeg are already installed");
        }
        Ok(InstallOutcome::Installed(tools)) => {
            state.toast("Setup complete", &format!("Installed {}", tools.join(" and ")));
        }
        Err(VidloaderError::SetupBusy) => {
            state.toast("Setup in progress", &VidloaderError::SetupBusy.to_string());
        }
        Err(e) => {
            error!("Setup failed: {}", e);
            state.toast("Setup failed", &e.to_string());
        }
    }
}

async fn update(state: &PluginState) {
    state.toast("Updating yt-dlp", "Fetching the latest release");
    match state.installer.update_ytdlp().await {
        Ok(UpdateOutcome::Updated(version)) => {
            state.toast("yt-dlp updated", &format!("Now at version {}", version));
        }
        Ok(UpdateOutcome::RolledBack(reason)) => {
            state.toast(
                "yt-dlp update failed",
                &format!("Kept the previous version. {}", reason),
            );
        }
        Err(e) => {
            error!("Update failed: {}", e);
            state.toast("yt-dlp update failed", &e.to_string());
        }
    }
}

fn open_folder(state: &PluginState, folder: &Path, reuse_window: bool) {
    if let Err(e) = std::fs::create_dir_all(folder) {
        warn!("Cannot create {}: {}", folder.display(), e);
    }
    match state.folders.open(folder, reuse_window) {
        Ok(OpenOutcome::Opened) => debug!("Opened {}", folder.display()),
        Ok(OpenOutcome::Reused) => {}
        Err(e) => state.toast(
            "Could not open folder",
            &format!("{}: {}", folder.display(), e),
        ),
    }
}

fn copy_url(state: &PluginState, url: &str) {
    let copied = arboard::Clipboard::new()
        .and_then(|mut clipboard| clipboard.set_text(url.to_string()))
        .map_err(|e| VidloaderError::ClipboardError(e.to_string()));

    match copied {
        Ok(()) => debug!("Copied {} to clipboard", url),
        Err(e) => {
            warn!("{}", e);
            state.toast("Copy failed", &e.to_string());
        }
    }
}
