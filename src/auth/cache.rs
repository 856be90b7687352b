use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{AccessToken, AuthError, IdentityProvider};

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Process-wide holder of the current access token.
///
/// Empty until the first push asks for a token. The lock is held while a
/// renewal is in flight, so concurrent pushes wait for it instead of starting
/// a second one and overwriting its result.
pub struct TokenCache {
    provider: Arc<dyn IdentityProvider>,
    token: Mutex<Option<AccessToken>>,
    now_provider: NowProvider,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            token: Mutex::new(None),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Current token, acquiring a new one first when none is cached or it has expired.
    pub async fn get(&self, scopes: &[String]) -> Result<AccessToken, AuthError> {
        let mut guard = self.token.lock().await;
        let now = (self.now_provider)();

        if let Some(token) = guard.as_ref()
            && !token.is_expired_at(now)
        {
            debug!("reusing cached access token");
            return Ok(token.clone());
        }

        let fresh = self.provider.acquire(scopes).await?;
        info!(expires_at = %fresh.expires_at, "access token acquired");
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop the cached token so the next `get` acquires a new one.
    pub async fn invalidate(&self) {
        self.token.lock().await.take();
    }
}
