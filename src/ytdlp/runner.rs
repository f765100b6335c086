//! Process runner for the external tools

use crate::ytdlp::args::display_command_line;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, warn};

#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// How the external process is presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// The user watches the tool's own output; nothing is captured
    Visible,
    /// stdout/stderr are captured into the result
    Hidden,
}

/// Outcome of one external process run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Set only when the process could not be started
    pub spawn_error: Option<String>,
}

impl ProcessResult {
    /// The process never started; the spawn error text is also copied to stderr
    pub fn spawn_failure(error: impl ToString) -> Self {
        let error = error.to_string();
        Self {
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: error.clone(),
            spawn_error: Some(error),
        }
    }

    /// True when the process could not be started at all. A process killed
    /// by a signal has no exit code either, but it did start.
    pub fn is_spawn_failure(&self) -> bool {
        self.spawn_error.is_some()
    }
}

/// Runs an external tool.
///
/// A non-zero exit is a normal [`ProcessResult`], not an error.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        working_dir: Option<&Path>,
        mode: RunMode,
    ) -> ProcessResult;
}

/// [`ToolRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(program: &Path, args: &[String], working_dir: Option<&Path>) -> AsyncCommand {
        let mut cmd = AsyncCommand::new(program);
        cmd.args(args);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        working_dir: Option<&Path>,
        mode: RunMode,
    ) -> ProcessResult {
        debug!(
            "Running ({:?}): {}",
            mode,
            display_command_line(&program.to_string_lossy(), args)
        );

        let mut cmd = Self::command(program, args, working_dir);

        match mode {
            RunMode::Visible => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
                #[cfg(windows)]
                cmd.creation_flags(CREATE_NEW_CONSOLE);

                match cmd.status().await {
                    Ok(status) => ProcessResult {
                        success: status.success(),
                        exit_code: status.code(),
                        ..Default::default()
                    },
                    Err(e) => {
                        error!("Failed to start {}: {}", program.display(), e);
                        ProcessResult::spawn_failure(e)
                    }
                }
            }
            RunMode::Hidden => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .kill_on_drop(true);
                #[cfg(windows)]
                cmd.creation_flags(CREATE_NO_WINDOW);

                match cmd.output().await {
                    Ok(output) => {
                        let result = ProcessResult {
                            success: output.status.success(),
                            exit_code: output.status.code(),
                            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                            spawn_error: None,
                        };
                        if !result.success {
                            warn!(
                                "{} exited with {:?}",
                                program.display(),
                                result.exit_code
                            );
                        }
                        result
                    }
                    Err(e) => {
                        error!("Failed to start {}: {}", program.display(), e);
                        ProcessResult::spawn_failure(e)
                    }
                }
            }
        }
    }
}
