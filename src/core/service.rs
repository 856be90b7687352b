//! Clock-in / clock-out orchestration shared by the one-shot commands and the shell.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::auth::TokenCache;
use crate::config::Settings;
use crate::core::session::{CompletedSession, OpenSession, SessionTracker, WorkerIdentity};
use crate::errors::{AppError, AppResult};
use crate::ledger::LocalLedger;
use crate::remote::RemoteSync;

pub struct ClockService {
    tracker: SessionTracker,
    ledger: LocalLedger,
    sync: RemoteSync,
    settings: Settings,
    settings_path: PathBuf,
}

impl ClockService {
    pub fn new(
        tracker: SessionTracker,
        ledger: LocalLedger,
        sync: RemoteSync,
        settings: Settings,
        settings_path: PathBuf,
    ) -> Self {
        Self {
            tracker,
            ledger,
            sync,
            settings,
            settings_path,
        }
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut SessionTracker {
        &mut self.tracker
    }

    pub fn ledger(&self) -> &LocalLedger {
        &self.ledger
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_identity(&mut self, identity: WorkerIdentity) {
        self.tracker.set_identity(identity);
    }

    pub fn clock_in(&mut self, task: &str) -> AppResult<&OpenSession> {
        self.tracker.begin(task)?;
        let open = self
            .tracker
            .open_session()
            .ok_or_else(|| AppError::State("session did not open".into()))?;
        info!(task = %open.task_description, "clocked in");
        Ok(open)
    }

    /// Close the session, make it durable, then hand it to the remote sync.
    ///
    /// The ledger append happens before anything remote is attempted. When the
    /// append fails the session is reopened and the error returned, so the
    /// clock-out can be retried.
    pub fn clock_out(&mut self) -> AppResult<CompletedSession> {
        let done = self.tracker.end()?;

        if let Err(e) = self.ledger.append(&done.to_record()) {
            error!(error = %e, "ledger append failed, keeping the session open");
            self.tracker.restore(OpenSession {
                task_description: done.task_description.clone(),
                start: done.start,
            })?;
            return Err(e);
        }

        info!(
            task = %done.task_description,
            hours = done.duration_hours,
            "clocked out"
        );
        self.sync.spawn_push(done.clone(), &self.settings);
        Ok(done)
    }

    /// Persist new settings and drop the cached remote target.
    ///
    /// `tokens` is the token cache built for the new identity-provider settings.
    pub async fn update_settings(
        &mut self,
        settings: Settings,
        tokens: Arc<TokenCache>,
    ) -> AppResult<()> {
        settings.save(&self.settings_path)?;
        self.settings = settings;
        self.sync.set_tokens(tokens);
        self.sync.invalidate_target().await;
        info!("settings updated");
        Ok(())
    }

    pub fn pending_pushes(&self) -> usize {
        self.sync.in_flight()
    }

    /// Let outstanding pushes finish (up to `grace`) before the process exits.
    pub async fn shutdown(self, grace: Duration) {
        self.sync.shutdown(grace).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, AuthError, IdentityProvider};
    use crate::remote::{RemoteError, RemoteLog, RemoteRecord, RemoteTarget, SyncFailure, TargetCache};
    use crate::utils::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::Utc;
    use tempfile::{TempDir, tempdir};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct OkProvider;

    #[async_trait]
    impl IdentityProvider for OkProvider {
        async fn acquire(&self, _scopes: &[String]) -> Result<AccessToken, AuthError> {
            Ok(AccessToken {
                value: "tok".into(),
                expires_at: Utc::now() + chrono::Duration::hours(1),
            })
        }
    }

    /// Remote that answers every write with 401.
    struct DenyingRemote;

    #[async_trait]
    impl RemoteLog for DenyingRemote {
        async fn resolve_site(&self, _: &str, _: &str) -> Result<String, RemoteError> {
            Ok("site".into())
        }

        async fn find_list(&self, _: &str, _: &str, _: &str) -> Result<Option<String>, RemoteError> {
            Ok(Some("list".into()))
        }

        async fn create_item(
            &self,
            _: &str,
            _: &RemoteTarget,
            _: &RemoteRecord,
        ) -> Result<(), RemoteError> {
            Err(RemoteError::from_status(401, "token expired"))
        }
    }

    fn remote_settings() -> Settings {
        Settings {
            client_id: "c".into(),
            authority: "https://login.example.com/t".into(),
            site_url: "https://contoso.sharepoint.com/sites/team".into(),
            list_name: "Hours".into(),
            ..Settings::default()
        }
    }

    fn service(
        settings: Settings,
    ) -> (ClockService, Arc<ManualClock>, UnboundedReceiver<SyncFailure>, TempDir) {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::at(1000.0));
        let (sync, rx) = RemoteSync::with_hostname(
            Arc::new(DenyingRemote),
            Arc::new(TokenCache::new(Arc::new(OkProvider))),
            Arc::new(TargetCache::in_memory()),
            clock.clone(),
            "host".into(),
        );
        let svc = ClockService::new(
            SessionTracker::new(clock.clone()),
            LocalLedger::new(dir.path().join("time_log.csv")),
            sync,
            settings,
            dir.path().join("settings.json"),
        );
        (svc, clock, rx, dir)
    }

    #[tokio::test]
    async fn unauthorized_push_does_not_affect_clock_out() {
        let (mut svc, clock, mut rx, _dir) = service(remote_settings());

        svc.clock_in("Fix bug").unwrap();
        clock.set(4600.0);
        let done = svc.clock_out().unwrap();
        assert_eq!(done.duration_hours, 1.0);

        // durable before the push resolves
        let rows = svc.ledger().load().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task_description, "Fix bug");
        assert_eq!((rows[0].start, rows[0].end, rows[0].duration_hours), (1000.0, 4600.0, 1.0));

        svc.shutdown(Duration::from_secs(5)).await;
        assert!(matches!(
            rx.recv().await,
            Some(SyncFailure::Remote {
                error: RemoteError::Unauthorized { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn clock_out_without_clock_in_appends_nothing() {
        let (mut svc, _, _rx, _dir) = service(Settings::default());
        assert!(matches!(svc.clock_out(), Err(AppError::State(_))));
        assert!(svc.ledger().load().unwrap().is_empty());
        assert_eq!(svc.pending_pushes(), 0);
    }

    #[tokio::test]
    async fn failed_append_keeps_the_session_open() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::at(0.0));
        let (sync, _rx) = RemoteSync::with_hostname(
            Arc::new(DenyingRemote),
            Arc::new(TokenCache::new(Arc::new(OkProvider))),
            Arc::new(TargetCache::in_memory()),
            clock.clone(),
            "host".into(),
        );
        // the ledger path is a directory, so appending fails
        let mut svc = ClockService::new(
            SessionTracker::new(clock.clone()),
            LocalLedger::new(dir.path()),
            sync,
            Settings::default(),
            dir.path().join("settings.json"),
        );

        svc.clock_in("task").unwrap();
        clock.set(3600.0);
        assert!(svc.clock_out().is_err());
        assert_eq!(svc.tracker().open_session().unwrap().start, 0.0);
    }

    #[tokio::test]
    async fn update_settings_persists_them() {
        let (mut svc, _, _rx, dir) = service(Settings::default());
        svc.update_settings(remote_settings(), Arc::new(TokenCache::new(Arc::new(OkProvider))))
            .await
            .unwrap();
        let back = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(back, remote_settings());
        assert!(svc.settings().remote_enabled());
    }
}
