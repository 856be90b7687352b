//! Clock session state machine.
//!
//! `Idle --begin--> Open --end--> Idle`, emitting a [`CompletedSession`] on the
//! way back. The tracker owns no I/O: persisting the result is the caller's job.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::ledger::LedgerRecord;
use crate::utils::clock::Clock;
use crate::utils::time::{self, DATE_FORMAT};

/// Worker id and department typed by the user; attached to each completed session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub department: String,
}

/// The session currently being timed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenSession {
    pub task_description: String,
    pub start: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSession {
    pub task_description: String,
    pub start: f64,
    pub end: f64,
    pub duration_hours: f64,
    pub identity: WorkerIdentity,
}

impl CompletedSession {
    /// Ledger row for this session; the date is the local date of clock-in.
    pub fn to_record(&self) -> LedgerRecord {
        let date = time::local_date(self.start)
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default();

        LedgerRecord {
            date,
            task_description: self.task_description.clone(),
            start: self.start,
            end: self.end,
            duration_hours: self.duration_hours,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Idle,
    Open(OpenSession),
}

pub struct SessionTracker {
    state: State,
    identity: WorkerIdentity,
    clock: Arc<dyn Clock>,
}

impl SessionTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: State::Idle,
            identity: WorkerIdentity::default(),
            clock,
        }
    }

    /// Start timing `task`. Rejected when the task is blank or a session is already open.
    pub fn begin(&mut self, task: &str) -> AppResult<()> {
        let task = task.trim();
        if task.is_empty() {
            return Err(AppError::Validation(
                "Please enter a task description before clocking in.".into(),
            ));
        }
        if let State::Open(open) = &self.state {
            return Err(AppError::State(format!(
                "already clocked in on '{}'",
                open.task_description
            )));
        }

        let start = time::to_epoch_seconds(self.clock.now());
        debug!(task, start, "session opened");
        self.state = State::Open(OpenSession {
            task_description: task.to_string(),
            start,
        });
        Ok(())
    }

    /// Close the open session and return it; the tracker goes back to idle.
    pub fn end(&mut self) -> AppResult<CompletedSession> {
        let open = match std::mem::replace(&mut self.state, State::Idle) {
            State::Open(open) => open,
            State::Idle => return Err(AppError::State("not clocked in".into())),
        };

        let end = time::to_epoch_seconds(self.clock.now());
        let completed = CompletedSession {
            duration_hours: time::duration_hours(open.start, end),
            task_description: open.task_description,
            start: open.start,
            end,
            identity: self.identity.clone(),
        };
        debug!(
            task = %completed.task_description,
            hours = completed.duration_hours,
            "session closed"
        );
        Ok(completed)
    }

    pub fn set_identity(&mut self, identity: WorkerIdentity) {
        self.identity = identity;
    }

    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    pub fn open_session(&self) -> Option<&OpenSession> {
        match &self.state {
            State::Open(open) => Some(open),
            State::Idle => None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open_session().is_some()
    }

    /// Seconds since clock-in, if a session is open.
    pub fn elapsed_seconds(&self) -> Option<f64> {
        self.open_session()
            .map(|open| time::to_epoch_seconds(self.clock.now()) - open.start)
    }

    /// The open session and how long it has been running.
    pub fn status(&self) -> Option<(&OpenSession, f64)> {
        self.open_session().zip(self.elapsed_seconds())
    }

    /// Drop the open session without completing it.
    pub fn discard(&mut self) -> Option<OpenSession> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Open(open) => Some(open),
            State::Idle => None,
        }
    }

    /// Re-enter the Open state from a session persisted by a previous process.
    pub fn restore(&mut self, open: OpenSession) -> AppResult<()> {
        if self.is_open() {
            return Err(AppError::State("a session is already open".into()));
        }
        self.state = State::Open(open);
        Ok(())
    }
}
