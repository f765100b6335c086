//! Test doubles shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use vidloader::plugin::HostApi;
use vidloader::setup::ArtifactFetcher;
use vidloader::utils::VidloaderError;
use vidloader::ytdlp::{ProcessResult, RunMode, ToolRunner};

/// Serves canned bodies by URL; unknown URLs fail like an offline network
#[derive(Default)]
pub struct FakeFetcher {
    bodies: HashMap<String, Vec<u8>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn serving(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, VidloaderError> {
        self.fetched.lock().unwrap().push(url.to_string());
        match self.bodies.get(url) {
            Some(body) => {
                std::fs::write(dest, body)?;
                Ok(body.len() as u64)
            }
            None => Err(VidloaderError::IoError(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "offline",
            ))),
        }
    }
}

/// Answers every run with the same result
pub struct FakeRunner {
    result: ProcessResult,
    calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl FakeRunner {
    pub fn answering(result: ProcessResult) -> Self {
        Self {
            result,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(stdout: &str) -> Self {
        Self::answering(ProcessResult {
            success: true,
            exit_code: Some(0),
            stdout: stdout.to_string(),
            ..Default::default()
        })
    }

    pub fn failing(stderr: &str) -> Self {
        Self::answering(ProcessResult {
            success: false,
            exit_code: Some(1),
            stderr: stderr.to_string(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        _working_dir: Option<&Path>,
        _mode: RunMode,
    ) -> ProcessResult {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_path_buf(), args.to_vec()));
        self.result.clone()
    }
}

impl FakeRunner {
    pub fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

/// Collects toasts instead of showing them
#[derive(Default)]
pub struct RecordingHost {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingHost {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.messages().into_iter().map(|(title, _)| title).collect()
    }
}

impl HostApi for RecordingHost {
    fn show_msg(&self, title: &str, body: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}
