//! vidloader - launcher plugin for downloading videos with yt-dlp
//!
//! This binary drives the plugin from a terminal: the same queries, actions
//! and settings a launcher host would use, with toasts printed to stdout.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use vidloader::plugin::{HostApi, Plugin, PluginAction, PluginContext};
use vidloader::utils::config::{SettingValue, VideoQuality};
use vidloader::ytdlp::builder::{require_supported_url, DownloadKind};

#[derive(Parser)]
#[command(name = "vidloader", version, about = "Download videos with yt-dlp")]
struct Args {
    /// Directory holding managed tools and the history database
    #[arg(long, global = true)]
    plugin_dir: Option<PathBuf>,

    /// Directory holding settings.json
    #[arg(long, global = true)]
    settings_dir: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the result rows a launcher query would produce
    Query { text: Vec<String> },
    /// Download a video, its audio, or its subtitles
    Download {
        url: String,
        /// best, 1080p, 720p, 480p or 360p (defaults to the saved setting)
        #[arg(long, short)]
        quality: Option<String>,
        #[arg(long, conflicts_with_all = ["quality", "subtitles"])]
        audio: bool,
        #[arg(long, conflicts_with = "quality")]
        subtitles: bool,
    },
    /// List the formats available for a video
    Formats { url: String },
    /// Install yt-dlp and ffmpeg if they are missing
    Setup,
    /// Update yt-dlp to the latest release
    Update,
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsCommand>,
    },
    /// Show recent downloads
    History {
        #[arg(long, short, default_value_t = 10)]
        limit: u32,
    },
    /// Open the download folder
    OpenFolder,
}

#[derive(Subcommand)]
enum SettingsCommand {
    List,
    Set { key: String, value: String },
}

/// Prints toasts to the terminal
struct ConsoleHost;

impl HostApi for ConsoleHost {
    fn show_msg(&self, title: &str, body: &str) {
        println!("{}", title);
        for line in body.lines() {
            println!("  {}", line);
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let context = PluginContext::resolve(args.plugin_dir, args.settings_dir);
    let plugin = Plugin::init(context, Arc::new(ConsoleHost))
        .await
        .context("Failed to initialize plugin")?;

    match args.command {
        Command::Query { text } => {
            for result in plugin.query(&text.join(" ")).await {
                println!("{}", result.title);
                if !result.subtitle.is_empty() {
                    println!("  {}", result.subtitle);
                }
            }
        }
        Command::Download {
            url,
            quality,
            audio,
            subtitles,
        } => {
            let url = require_supported_url(&url)?;
            let kind = if audio {
                DownloadKind::Audio
            } else if subtitles {
                DownloadKind::Subtitles
            } else {
                let quality = match quality {
                    Some(token) => token.parse::<VideoQuality>()?,
                    None => plugin.settings().default_video_quality,
                };
                DownloadKind::Video(quality)
            };
            run_action(&plugin, PluginAction::Download { url, kind }).await?;
        }
        Command::Formats { url } => {
            let url = require_supported_url(&url)?;
            run_action(&plugin, PluginAction::ListFormats { url }).await?
        }
        Command::Setup => run_action(&plugin, PluginAction::InstallTools).await?,
        Command::Update => run_action(&plugin, PluginAction::UpdateYtDlp).await?,
        Command::OpenFolder => run_action(&plugin, PluginAction::OpenFolder).await?,
        Command::Settings { action } => match action.unwrap_or(SettingsCommand::List) {
            SettingsCommand::List => {
                for option in plugin.options() {
                    let value = match option.value {
                        SettingValue::Text(text) => text,
                        SettingValue::Checkbox(checked) => checked.to_string(),
                    };
                    println!("{:<26} {}", option.key, value);
                }
            }
            SettingsCommand::Set { key, value } => {
                let accepted = plugin.update_settings(&[(key.clone(), SettingValue::Text(value))]);
                if accepted == 0 {
                    anyhow::bail!("Setting {} was rejected; see the log for details", key);
                }
                println!("Saved {}", key);
            }
        },
        Command::History { limit } => {
            let history = plugin
                .history()
                .context("Download history is unavailable")?;
            let entries = history.last(limit).await?;
            if entries.is_empty() {
                println!("No downloads yet");
            }
            for entry in entries {
                println!("{}", entry.summary());
                if let Some(path) = &entry.file_path {
                    println!("  {}", path.display());
                } else if let Some(error) = &entry.error_message {
                    println!("  {}", error);
                }
            }
        }
    }

    Ok(())
}

async fn run_action(plugin: &Plugin, action: PluginAction) -> Result<()> {
    plugin
        .execute(action)
        .await
        .context("Background task panicked")
}
