//! Background delivery of completed sessions to the remote list.
//!
//! Every clock-out spawns one push task. Tasks are kept in a `JoinSet` so the
//! process can wait for them before exiting; failures never reach the caller
//! and are sent over a channel to [`log_failures`] instead.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{RemoteError, RemoteLog, RemoteRecord, RemoteTarget};
use crate::auth::{AccessToken, AuthError, TokenCache};
use crate::config::Settings;
use crate::core::session::CompletedSession;
use crate::ui::messages;
use crate::utils::clock::Clock;

/// A push that did not make it to the remote list.
#[derive(Debug)]
pub enum SyncFailure {
    Auth { task: String, error: AuthError },
    Remote { task: String, error: RemoteError },
}

/// Resolved site/list ids, kept in memory and optionally on disk.
pub struct TargetCache {
    memo: Mutex<Option<RemoteTarget>>,
    file: Option<PathBuf>,
}

impl TargetCache {
    pub fn in_memory() -> Self {
        Self {
            memo: Mutex::new(None),
            file: None,
        }
    }

    /// Cache backed by `path`; a previous resolution is picked up from it.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stored = fs::read_to_string(&path)
            .ok()
            .and_then(|c| serde_json::from_str::<RemoteTarget>(&c).ok());
        Self {
            memo: Mutex::new(stored),
            file: Some(path),
        }
    }

    /// Cached target for the current settings, resolving it with two reads when needed.
    pub async fn resolve(
        &self,
        remote: &dyn RemoteLog,
        token: &str,
        settings: &Settings,
    ) -> Result<RemoteTarget, RemoteError> {
        let mut memo = self.memo.lock().await;
        if let Some(target) = memo.as_ref()
            && target.matches(&settings.site_url, &settings.list_name)
        {
            return Ok(target.clone());
        }

        let site_id = remote
            .resolve_site(token, &settings.site_url)
            .await
            .map_err(|e| resolution_error("site", e))?;
        let list_id = remote
            .find_list(token, &site_id, &settings.list_name)
            .await
            .map_err(|e| resolution_error("list", e))?
            .ok_or_else(|| {
                RemoteError::ConfigurationError(format!(
                    "list '{}' not found on {}",
                    settings.list_name, settings.site_url
                ))
            })?;

        let target = RemoteTarget {
            site_url: settings.site_url.clone(),
            list_name: settings.list_name.clone(),
            site_id,
            list_id,
        };
        info!(site_id = %target.site_id, list_id = %target.list_id, "remote target resolved");

        if let Some(path) = &self.file
            && let Err(e) = serde_json::to_string_pretty(&target)
                .map_err(io::Error::other)
                .and_then(|json| fs::write(path, json))
        {
            warn!(error = %e, "could not persist remote target");
        }

        *memo = Some(target.clone());
        Ok(target)
    }

    /// Forget the resolved ids, e.g. after the settings changed.
    pub async fn invalidate(&self) {
        self.memo.lock().await.take();
        if let Some(path) = &self.file {
            let _ = fs::remove_file(path);
        }
    }
}

/// A rejected token stays `Unauthorized` so the caller drops it; anything
/// else means the configured site or list cannot be used.
fn resolution_error(what: &str, cause: RemoteError) -> RemoteError {
    match cause {
        RemoteError::ConfigurationError(_) | RemoteError::Unauthorized { .. } => cause,
        other => RemoteError::ConfigurationError(format!("{what} lookup failed: {other}")),
    }
}

/// Everything a push task needs; cheap to clone into each task.
#[derive(Clone)]
struct SyncContext {
    remote: Arc<dyn RemoteLog>,
    tokens: Arc<TokenCache>,
    targets: Arc<TargetCache>,
    clock: Arc<dyn Clock>,
    hostname: String,
}

impl SyncContext {
    async fn push(
        &self,
        session: &CompletedSession,
        settings: &Settings,
        token: &AccessToken,
    ) -> Result<(), RemoteError> {
        let target = self
            .targets
            .resolve(self.remote.as_ref(), &token.value, settings)
            .await?;
        let record = RemoteRecord::build(session, &self.hostname, self.clock.now().date_naive());
        self.remote.create_item(&token.value, &target, &record).await
    }

    async fn deliver(&self, session: CompletedSession, settings: Settings) -> Option<SyncFailure> {
        let task = session.task_description.clone();

        let token = match self.tokens.get(&settings.scopes).await {
            Ok(token) => token,
            Err(error) => return Some(SyncFailure::Auth { task, error }),
        };

        match self.push(&session, &settings, &token).await {
            Ok(()) => {
                info!(task = %task, "session added to remote list");
                None
            }
            Err(error) => {
                if matches!(error, RemoteError::Unauthorized { .. }) {
                    self.tokens.invalidate().await;
                }
                Some(SyncFailure::Remote { task, error })
            }
        }
    }
}

pub struct RemoteSync {
    ctx: SyncContext,
    tasks: JoinSet<()>,
    failures: mpsc::UnboundedSender<SyncFailure>,
}

impl RemoteSync {
    /// Build the orchestrator and the receiving end of its failure channel.
    pub fn new(
        remote: Arc<dyn RemoteLog>,
        tokens: Arc<TokenCache>,
        targets: Arc<TargetCache>,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<SyncFailure>) {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown-host".to_string());
        Self::with_hostname(remote, tokens, targets, clock, hostname)
    }

    pub fn with_hostname(
        remote: Arc<dyn RemoteLog>,
        tokens: Arc<TokenCache>,
        targets: Arc<TargetCache>,
        clock: Arc<dyn Clock>,
        hostname: String,
    ) -> (Self, mpsc::UnboundedReceiver<SyncFailure>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sync = Self {
            ctx: SyncContext {
                remote,
                tokens,
                targets,
                clock,
                hostname,
            },
            tasks: JoinSet::new(),
            failures: tx,
        };
        (sync, rx)
    }

    /// Push one record with an already acquired token.
    pub async fn push(
        &self,
        session: &CompletedSession,
        settings: &Settings,
        token: &AccessToken,
    ) -> Result<(), RemoteError> {
        self.ctx.push(session, settings, token).await
    }

    /// Start a detached push for `session` and return immediately.
    ///
    /// Nothing is spawned when no remote setting is filled in; a partially
    /// filled configuration is reported as a configuration failure.
    pub fn spawn_push(&mut self, session: CompletedSession, settings: &Settings) {
        while self.tasks.try_join_next().is_some() {}

        let untouched = settings.client_id.is_empty()
            && settings.authority.is_empty()
            && settings.site_url.is_empty()
            && settings.list_name.is_empty();
        if untouched {
            debug!("remote sync not configured, skipping push");
            return;
        }

        if !settings.remote_enabled() {
            let _ = self.failures.send(SyncFailure::Remote {
                task: session.task_description,
                error: RemoteError::ConfigurationError(
                    "client_id, authority, site_url and list_name must all be set".into(),
                ),
            });
            return;
        }

        let ctx = self.ctx.clone();
        let failures = self.failures.clone();
        let settings = settings.clone();
        self.tasks.spawn(async move {
            if let Some(failure) = ctx.deliver(session, settings).await {
                let _ = failures.send(failure);
            }
        });
    }

    /// Pushes spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Use `tokens` for pushes spawned from now on; running ones keep theirs.
    pub fn set_tokens(&mut self, tokens: Arc<TokenCache>) {
        self.ctx.tokens = tokens;
    }

    /// Forget cached site/list ids; the next push resolves them again.
    pub async fn invalidate_target(&self) {
        self.ctx.targets.invalidate().await;
    }

    /// Wait up to `grace` for outstanding pushes, then abort the rest.
    pub async fn shutdown(mut self, grace: Duration) {
        let pending = self.tasks.len();
        if pending == 0 {
            return;
        }
        debug!(pending, "waiting for remote pushes");

        let drained = tokio::time::timeout(grace, async {
            while self.tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = self.tasks.len(),
                "remote pushes still running at shutdown, aborting"
            );
            self.tasks.shutdown().await;
        }
    }
}

/// Drain the failure channel into the log until every sender is gone.
///
/// Authentication problems are also shown to the user; remote failures are
/// only logged.
pub async fn log_failures(mut rx: mpsc::UnboundedReceiver<SyncFailure>) {
    while let Some(failure) = rx.recv().await {
        match failure {
            SyncFailure::Auth { task, error } => {
                error!(task = %task, error = %error, "token acquisition failed, remote push aborted");
                messages::warning(format!(
                    "Could not sign in, '{task}' was saved locally only: {error}"
                ));
            }
            SyncFailure::Remote { task, error } => {
                warn!(task = %task, error = %error, "remote push failed");
            }
        }
    }
}
