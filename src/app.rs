//! Production wiring: builds the clock service on top of the real
//! identity provider, Graph client, ledger file and system clock.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::auth::{AccountStore, DeviceCodeProvider, ReqwestTransport, TokenCache};
use crate::config::{Paths, Settings};
use crate::core::active::ActiveSessionFile;
use crate::core::service::ClockService;
use crate::core::session::{SessionTracker, WorkerIdentity};
use crate::errors::AppResult;
use crate::ledger::LocalLedger;
use crate::remote::{GraphClient, RemoteSync, TargetCache, log_failures};
use crate::utils::clock::SystemClock;

/// What every command handler gets: where the files live and the loaded settings.
pub struct Context {
    pub paths: Paths,
    pub settings: Settings,
}

impl Context {
    pub fn load(paths: Paths) -> AppResult<Self> {
        let settings = Settings::load(&paths.settings_file())?;
        Ok(Self { paths, settings })
    }

    pub fn ledger(&self) -> LocalLedger {
        LocalLedger::new(self.paths.ledger_file())
    }

    pub fn session_file(&self) -> ActiveSessionFile {
        ActiveSessionFile::new(self.paths.session_file())
    }
}

/// Token cache for `settings`, backed by the device-code flow and the on-disk account.
pub fn token_cache(paths: &Paths, settings: &Settings) -> Arc<TokenCache> {
    let provider = DeviceCodeProvider::new(settings, Arc::new(ReqwestTransport::new()))
        .with_account_store(AccountStore::new(paths.token_cache_file()));
    Arc::new(TokenCache::new(Arc::new(provider)))
}

/// The service and the task that reports its background push failures.
///
/// The reporter finishes once the service has been shut down.
pub fn clock_service(ctx: &Context) -> (ClockService, JoinHandle<()>) {
    let clock = Arc::new(SystemClock);
    let (sync, failures) = RemoteSync::new(
        Arc::new(GraphClient::new()),
        token_cache(&ctx.paths, &ctx.settings),
        Arc::new(TargetCache::persistent(ctx.paths.target_file())),
        clock.clone(),
    );
    let reporter = tokio::spawn(log_failures(failures));

    let service = ClockService::new(
        SessionTracker::new(clock),
        ctx.ledger(),
        sync,
        ctx.settings.clone(),
        ctx.paths.settings_file(),
    );
    (service, reporter)
}

/// Overlay the identity fields given on the command line onto `current`.
pub fn merge_identity(
    current: &WorkerIdentity,
    user: Option<&str>,
    dept: Option<&str>,
) -> WorkerIdentity {
    WorkerIdentity {
        user_id: user.map(|u| u.trim().to_string()).unwrap_or_else(|| current.user_id.clone()),
        department: dept
            .map(|d| d.trim().to_string())
            .unwrap_or_else(|| current.department.clone()),
    }
}
