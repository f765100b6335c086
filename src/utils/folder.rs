//! Best-effort file browser invocation

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long a freshly opened folder window is assumed to still be around
pub const REUSE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Outcome of a folder open request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    /// The same folder was opened recently, no new window was spawned
    Reused,
}

/// Opens download folders in the platform file browser.
///
/// With reuse enabled, repeated requests for the same folder inside
/// [`REUSE_WINDOW`] do not spawn another window.
pub struct FolderOpener {
    last_opened: Mutex<Option<(PathBuf, Instant)>>,
    launcher: Box<dyn Fn(&Path) -> std::io::Result<()> + Send + Sync>,
}

impl Default for FolderOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderOpener {
    pub fn new() -> Self {
        Self::with_launcher(|path| open::that_detached(path))
    }

    /// Use a custom launcher instead of the system file browser
    pub fn with_launcher<F>(launcher: F) -> Self
    where
        F: Fn(&Path) -> std::io::Result<()> + Send + Sync + 'static,
    {
        Self {
            last_opened: Mutex::new(None),
            launcher: Box::new(launcher),
        }
    }

    pub fn open(&self, folder: &Path, reuse_window: bool) -> std::io::Result<OpenOutcome> {
        let mut last = self
            .last_opened
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if reuse_window {
            if let Some((path, at)) = last.as_ref() {
                if path == folder && at.elapsed() < REUSE_WINDOW {
                    debug!("Folder {} already open, reusing window", folder.display());
                    return Ok(OpenOutcome::Reused);
                }
            }
        }

        if let Err(e) = (self.launcher)(folder) {
            warn!("Could not open folder {}: {}", folder.display(), e);
            return Err(e);
        }

        *last = Some((folder.to_path_buf(), Instant::now()));
        Ok(OpenOutcome::Opened)
    }
}
