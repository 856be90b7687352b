//! OAuth 2.0 device authorization grant against a Microsoft identity platform
//! authority, with silent renewal through a cached refresh token.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AccessToken, AuthError, IdentityProvider};
use crate::config::Settings;
use crate::ui::messages;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const OFFLINE_SCOPE: &str = "offline_access";

/// Raw HTTP seam so the grant logic can be exercised without a network.
#[async_trait]
pub trait OAuthTransport: Send + Sync {
    /// POST a form and return the status code and body.
    async fn post_form(&self, url: &str, params: &[(&str, String)])
    -> Result<(u16, String), AuthError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl OAuthTransport for ReqwestTransport {
    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<(u16, String), AuthError> {
        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|error| AuthError::Request(format!("request failed: {error}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| AuthError::Request(format!("failed reading response: {error}")))?;
        Ok((status, body))
    }
}

/// The "signed-in account": a refresh token bound to the client it was issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CachedAccount {
    client_id: String,
    authority: String,
    refresh_token: String,
}

/// File holding the cached account. Stored in clear text.
#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Option<CachedAccount>, AuthError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| AuthError::Cache(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::Cache(e.to_string())),
        }
    }

    fn save(&self, account: &CachedAccount) -> Result<(), AuthError> {
        let json =
            serde_json::to_string_pretty(account).map_err(|e| AuthError::Cache(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| AuthError::Cache(e.to_string()))
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Cache(e.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeviceCodePayload {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default = "default_code_lifetime")]
    expires_in: i64,
    #[serde(default = "default_interval")]
    interval: u64,
    message: Option<String>,
}

fn default_code_lifetime() -> i64 {
    900
}

fn default_interval() -> u64 {
    5
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

enum PollOutcome {
    Token(TokenPayload),
    Pending,
    SlowDown,
}

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct DeviceCodeProvider {
    client_id: String,
    authority: String,
    transport: Arc<dyn OAuthTransport>,
    accounts: Option<AccountStore>,
    now_provider: NowProvider,
    poll_interval_override: Option<std::time::Duration>,
}

impl DeviceCodeProvider {
    pub fn new(settings: &Settings, transport: Arc<dyn OAuthTransport>) -> Self {
        Self {
            client_id: settings.client_id.trim().to_string(),
            authority: settings.authority.trim().trim_end_matches('/').to_string(),
            transport,
            accounts: None,
            now_provider: Arc::new(Utc::now),
            poll_interval_override: None,
        }
    }

    pub fn with_account_store(mut self, store: AccountStore) -> Self {
        self.accounts = Some(store);
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Poll faster than the server asks; only meant for tests.
    pub fn with_poll_interval(mut self, interval: std::time::Duration) -> Self {
        self.poll_interval_override = Some(interval);
        self
    }

    fn device_code_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/devicecode", self.authority)
    }

    fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority)
    }

    fn scope_param(scopes: &[String]) -> String {
        let mut all: Vec<&str> = scopes.iter().map(String::as_str).collect();
        if !all.contains(&OFFLINE_SCOPE) {
            all.push(OFFLINE_SCOPE);
        }
        all.join(" ")
    }

    fn cached_account(&self) -> Option<CachedAccount> {
        let store = self.accounts.as_ref()?;
        match store.load() {
            Ok(Some(acc)) if acc.client_id == self.client_id && acc.authority == self.authority => {
                Some(acc)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable account cache");
                None
            }
        }
    }

    fn remember(&self, refresh_token: Option<String>) {
        let (Some(store), Some(refresh_token)) = (self.accounts.as_ref(), refresh_token) else {
            return;
        };
        let account = CachedAccount {
            client_id: self.client_id.clone(),
            authority: self.authority.clone(),
            refresh_token,
        };
        if let Err(e) = store.save(&account) {
            warn!(error = %e, "could not persist account cache");
        }
    }

    fn token_from_payload(&self, payload: TokenPayload) -> Result<AccessToken, AuthError> {
        let value = payload
            .access_token
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AuthError::Request("token response has no access_token".into()))?;
        let lifetime = payload.expires_in.unwrap_or(0).max(0);
        self.remember(payload.refresh_token);
        Ok(AccessToken {
            value,
            expires_at: (self.now_provider)() + Duration::seconds(lifetime),
        })
    }

    fn parse_token(status: u16, body: &str) -> Result<TokenPayload, AuthError> {
        let parsed: TokenPayload = serde_json::from_str(body).map_err(|error| {
            AuthError::Request(format!("invalid token payload (http {status}): {error}"))
        })?;
        Ok(parsed)
    }

    async fn acquire_silent(&self, scopes: &[String]) -> Option<AccessToken> {
        let account = self.cached_account()?;
        let result = self
            .transport
            .post_form(
                &self.token_endpoint(),
                &[
                    ("grant_type", "refresh_token".to_string()),
                    ("client_id", self.client_id.clone()),
                    ("refresh_token", account.refresh_token),
                    ("scope", Self::scope_param(scopes)),
                ],
            )
            .await;

        let payload = match result.and_then(|(status, body)| Self::parse_token(status, &body)) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "silent renewal failed");
                return None;
            }
        };

        if let Some(code) = payload.error {
            info!(code, "cached account no longer valid, falling back to sign-in");
            if let Some(store) = &self.accounts {
                let _ = store.clear();
            }
            return None;
        }

        match self.token_from_payload(payload) {
            Ok(token) => {
                debug!("token renewed silently");
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, "silent renewal returned no token");
                None
            }
        }
    }

    async fn acquire_interactive(&self, scopes: &[String]) -> Result<AccessToken, AuthError> {
        let (status, body) = self
            .transport
            .post_form(
                &self.device_code_endpoint(),
                &[
                    ("client_id", self.client_id.clone()),
                    ("scope", Self::scope_param(scopes)),
                ],
            )
            .await?;

        if !(200..300).contains(&status) {
            let parsed = Self::parse_token(status, &body).ok();
            return Err(AuthError::Rejected {
                code: parsed
                    .as_ref()
                    .and_then(|p| p.error.clone())
                    .unwrap_or_else(|| format!("http_{status}")),
                description: parsed
                    .and_then(|p| p.error_description)
                    .unwrap_or(body),
            });
        }

        let device: DeviceCodePayload = serde_json::from_str(&body)
            .map_err(|e| AuthError::Request(format!("invalid device code payload: {e}")))?;

        messages::info(device.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, open {} and enter the code {}",
                device.verification_uri, device.user_code
            )
        }));

        let deadline = (self.now_provider)() + Duration::seconds(device.expires_in);
        let mut interval = std::time::Duration::from_secs(device.interval.max(1));

        loop {
            tokio::time::sleep(self.poll_interval_override.unwrap_or(interval)).await;

            if (self.now_provider)() >= deadline {
                return Err(AuthError::Expired);
            }

            match self.poll(&device.device_code).await? {
                PollOutcome::Token(payload) => return self.token_from_payload(payload),
                PollOutcome::Pending => {}
                PollOutcome::SlowDown => interval += std::time::Duration::from_secs(5),
            }
        }
    }

    async fn poll(&self, device_code: &str) -> Result<PollOutcome, AuthError> {
        let (status, body) = self
            .transport
            .post_form(
                &self.token_endpoint(),
                &[
                    ("grant_type", DEVICE_CODE_GRANT.to_string()),
                    ("client_id", self.client_id.clone()),
                    ("device_code", device_code.to_string()),
                ],
            )
            .await?;
        let payload = Self::parse_token(status, &body)?;
        let Some(code) = payload.error.clone() else {
            return Ok(PollOutcome::Token(payload));
        };

        match code.as_str() {
            "authorization_pending" => Ok(PollOutcome::Pending),
            "slow_down" => Ok(PollOutcome::SlowDown),
            "expired_token" | "code_expired" => Err(AuthError::Expired),
            "authorization_declined" | "access_denied" => Err(AuthError::Declined),
            _ => Err(AuthError::Rejected {
                code,
                description: payload.error_description.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl IdentityProvider for DeviceCodeProvider {
    async fn acquire(&self, scopes: &[String]) -> Result<AccessToken, AuthError> {
        if self.client_id.is_empty() || self.authority.is_empty() {
            return Err(AuthError::NotConfigured);
        }

        if let Some(token) = self.acquire_silent(scopes).await {
            return Ok(token);
        }
        self.acquire_interactive(scopes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<(u16, String)>>,
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl ScriptedTransport {
        fn push(&self, status: u16, body: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back((status, body.to_string()));
        }

        fn urls(&self) -> Vec<String> {
            self.requests.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
        }

        fn param(&self, idx: usize, key: &str) -> Option<String> {
            self.requests.lock().unwrap()[idx]
                .1
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[async_trait]
    impl OAuthTransport for ScriptedTransport {
        async fn post_form(
            &self,
            url: &str,
            params: &[(&str, String)],
        ) -> Result<(u16, String), AuthError> {
            self.requests.lock().unwrap().push((
                url.to_string(),
                params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            ));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AuthError::Request("no scripted response".into()))
        }
    }

    fn settings() -> Settings {
        Settings {
            client_id: "client-1".into(),
            authority: "https://login.example.com/tenant/".into(),
            ..Settings::default()
        }
    }

    const DEVICE: &str = r#"{"device_code":"dev","user_code":"ABCD","verification_uri":"https://example.com/device","expires_in":900,"interval":1}"#;

    #[tokio::test]
    async fn unconfigured_provider_fails_fast() {
        let transport = Arc::new(ScriptedTransport::default());
        let provider = DeviceCodeProvider::new(&Settings::default(), transport.clone());
        assert!(matches!(
            provider.acquire(&[]).await,
            Err(AuthError::NotConfigured)
        ));
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn interactive_flow_polls_until_token_and_caches_account() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(200, DEVICE);
        transport.push(400, r#"{"error":"authorization_pending"}"#);
        transport.push(
            200,
            r#"{"access_token":"at-1","refresh_token":"rt-1","expires_in":3600}"#,
        );

        let provider = DeviceCodeProvider::new(&settings(), transport.clone())
            .with_account_store(AccountStore::new(dir.path().join("token_cache.json")))
            .with_poll_interval(std::time::Duration::from_millis(1));

        let scopes = vec!["https://graph.microsoft.com/Sites.ReadWrite.All".to_string()];
        let token = provider.acquire(&scopes).await.unwrap();
        assert_eq!(token.value, "at-1");

        let urls = transport.urls();
        assert_eq!(
            urls[0],
            "https://login.example.com/tenant/oauth2/v2.0/devicecode"
        );
        assert_eq!(urls[1], "https://login.example.com/tenant/oauth2/v2.0/token");
        assert_eq!(
            transport.param(0, "scope").unwrap(),
            "https://graph.microsoft.com/Sites.ReadWrite.All offline_access"
        );
        assert_eq!(transport.param(1, "device_code").unwrap(), "dev");
        assert!(dir.path().join("token_cache.json").exists());
    }

    #[tokio::test]
    async fn cached_account_renews_silently() {
        let dir = tempdir().unwrap();
        let store = AccountStore::new(dir.path().join("token_cache.json"));
        store
            .save(&CachedAccount {
                client_id: "client-1".into(),
                authority: "https://login.example.com/tenant".into(),
                refresh_token: "rt-old".into(),
            })
            .unwrap();

        let transport = Arc::new(ScriptedTransport::default());
        transport.push(
            200,
            r#"{"access_token":"at-2","refresh_token":"rt-new","expires_in":60}"#,
        );

        let provider =
            DeviceCodeProvider::new(&settings(), transport.clone()).with_account_store(store.clone());
        let token = provider.acquire(&[]).await.unwrap();

        assert_eq!(token.value, "at-2");
        assert_eq!(transport.urls().len(), 1);
        assert_eq!(transport.param(0, "grant_type").unwrap(), "refresh_token");
        assert_eq!(transport.param(0, "refresh_token").unwrap(), "rt-old");
        assert_eq!(store.load().unwrap().unwrap().refresh_token, "rt-new");
    }

    #[tokio::test]
    async fn rejected_refresh_falls_back_to_device_code() {
        let dir = tempdir().unwrap();
        let store = AccountStore::new(dir.path().join("token_cache.json"));
        store
            .save(&CachedAccount {
                client_id: "client-1".into(),
                authority: "https://login.example.com/tenant".into(),
                refresh_token: "rt-revoked".into(),
            })
            .unwrap();

        let transport = Arc::new(ScriptedTransport::default());
        transport.push(400, r#"{"error":"invalid_grant","error_description":"revoked"}"#);
        transport.push(200, DEVICE);
        transport.push(200, r#"{"access_token":"at-3","expires_in":3600}"#);

        let provider = DeviceCodeProvider::new(&settings(), transport.clone())
            .with_account_store(store)
            .with_poll_interval(std::time::Duration::from_millis(1));

        assert_eq!(provider.acquire(&[]).await.unwrap().value, "at-3");
        assert_eq!(transport.urls().len(), 3);
    }

    #[tokio::test]
    async fn declined_sign_in_is_reported() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(200, DEVICE);
        transport.push(400, r#"{"error":"authorization_declined"}"#);

        let provider = DeviceCodeProvider::new(&settings(), transport)
            .with_poll_interval(std::time::Duration::from_millis(1));
        assert!(matches!(
            provider.acquire(&[]).await,
            Err(AuthError::Declined)
        ));
    }

    #[tokio::test]
    async fn account_for_another_client_is_ignored() {
        let dir = tempdir().unwrap();
        let store = AccountStore::new(dir.path().join("token_cache.json"));
        store
            .save(&CachedAccount {
                client_id: "someone-else".into(),
                authority: "https://login.example.com/tenant".into(),
                refresh_token: "rt".into(),
            })
            .unwrap();

        let transport = Arc::new(ScriptedTransport::default());
        transport.push(500, "oops");

        let provider = DeviceCodeProvider::new(&settings(), transport.clone()).with_account_store(store);
        match provider.acquire(&[]).await {
            Err(AuthError::Rejected { code, .. }) => assert_eq!(code, "http_500"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(transport.urls()[0].ends_with("/devicecode"));
    }
}
