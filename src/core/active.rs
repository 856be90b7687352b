//! Persistence of the open session between one-shot `in` / `out` invocations.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{error, warn};

use crate::core::session::{OpenSession, SessionTracker, WorkerIdentity};
use crate::errors::{AppError, AppResult};
use crate::ui::messages;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ActiveState {
    session: Option<OpenSession>,
    #[serde(default)]
    identity: WorkerIdentity,
}

pub struct ActiveSessionFile {
    path: PathBuf,
}

impl ActiveSessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted open session (if any) and identity into `tracker`.
    pub fn restore_into(&self, tracker: &mut SessionTracker) -> AppResult<()> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(AppError::Io(e)),
        };
        let state: ActiveState = serde_json::from_str(&content)?;

        tracker.set_identity(state.identity);
        if let Some(open) = state.session {
            tracker.restore(open)?;
        }
        Ok(())
    }

    /// Replace the tracker's state with what the file holds now.
    ///
    /// A long-running process calls this before acting, so that a session
    /// closed or opened by another invocation is seen.
    pub fn reload_into(&self, tracker: &mut SessionTracker) -> AppResult<()> {
        tracker.discard();
        tracker.set_identity(WorkerIdentity::default());
        self.restore_into(tracker)
    }

    /// Record a completed clock-out. Never fails: the ledger row already
    /// exists, so when the state cannot be written the file is removed
    /// rather than left holding the closed session.
    pub fn settle_after_close(&self, tracker: &SessionTracker) {
        let Err(e) = self.save_from(tracker) else {
            return;
        };
        error!(path = %self.path.display(), error = %e, "could not update the session file");
        messages::error(format!("Could not update {}: {e}", self.path.display()));

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "could not remove the stale session file"
            ),
        }
    }

    /// Write the tracker's current state.
    pub fn save_from(&self, tracker: &SessionTracker) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let state = ActiveState {
            session: tracker.open_session().cloned(),
            identity: tracker.identity().clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }
}
