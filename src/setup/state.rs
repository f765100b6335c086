//! Shared setup phase.
//!
//! At most one install or update runs at a time. Starting one takes a
//! [`SetupTicket`]; dropping the ticket without finishing it puts the
//! previous phase back, so a failed or cancelled task never leaves the
//! slot stuck in a busy phase.

use crate::utils::error::VidloaderError;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetupPhase {
    NotInstalled,
    Installing,
    Installed,
    Updating,
    /// The last update was rolled back; the previous yt-dlp is still usable
    UpdateFailed,
}

impl SetupPhase {
    pub fn is_busy(&self) -> bool {
        matches!(self, SetupPhase::Installing | SetupPhase::Updating)
    }

    /// Whether downloads can run in this phase
    pub fn tools_usable(&self) -> bool {
        matches!(self, SetupPhase::Installed | SetupPhase::UpdateFailed)
    }
}

impl fmt::Display for SetupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SetupPhase::NotInstalled => "not installed",
            SetupPhase::Installing => "installing",
            SetupPhase::Installed => "installed",
            SetupPhase::Updating => "updating",
            SetupPhase::UpdateFailed => "update failed",
        };
        f.write_str(text)
    }
}

/// Process-wide setup phase behind a mutex
#[derive(Debug)]
pub struct SetupSlot {
    phase: Mutex<SetupPhase>,
}

impl Default for SetupSlot {
    fn default() -> Self {
        Self::new(SetupPhase::NotInstalled)
    }
}

impl SetupSlot {
    pub fn new(initial: SetupPhase) -> Self {
        Self {
            phase: Mutex::new(initial),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SetupPhase> {
        // The phase is a plain Copy value, so a poisoned lock still holds a
        // coherent one.
        self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn phase(&self) -> SetupPhase {
        *self.lock()
    }

    /// Overwrite the phase unless a task currently owns the slot
    pub fn settle(&self, phase: SetupPhase) {
        let mut current = self.lock();
        if !current.is_busy() {
            *current = phase;
        }
    }

    /// Move into `busy` and hand out the ticket for it.
    ///
    /// Fails with [`VidloaderError::SetupBusy`] while another install or
    /// update holds the slot.
    pub fn try_begin(self: &Arc<Self>, busy: SetupPhase) -> Result<SetupTicket, VidloaderError> {
        let mut current = self.lock();
        if current.is_busy() {
            debug!("Setup slot busy ({}), refusing {}", *current, busy);
            return Err(VidloaderError::SetupBusy);
        }

        let previous = *current;
        *current = busy;
        debug!("Setup phase {} -> {}", previous, busy);

        Ok(SetupTicket {
            slot: Arc::clone(self),
            previous,
            finished: false,
        })
    }
}

/// Ownership of the setup slot for one install or update
#[derive(Debug)]
pub struct SetupTicket {
    slot: Arc<SetupSlot>,
    previous: SetupPhase,
    finished: bool,
}

impl SetupTicket {
    /// Phase the slot returns to if the ticket is dropped unfinished
    pub fn previous(&self) -> SetupPhase {
        self.previous
    }

    /// Release the slot into `phase`
    pub fn finish(mut self, phase: SetupPhase) {
        *self.slot.lock() = phase;
        self.finished = true;
        debug!("Setup finished in phase {}", phase);
    }
}

impl Drop for SetupTicket {
    fn drop(&mut self) {
        if !self.finished {
            *self.slot.lock() = self.previous;
            debug!("Setup abandoned, phase restored to {}", self.previous);
        }
    }
}
