//! Bearer tokens for the remote list API.
//!
//! [`IdentityProvider`] is the seam: the application only ever asks for a
//! token through [`TokenCache`], which renews lazily once the current token
//! has expired.

mod cache;
mod device_code;

pub use cache::TokenCache;
pub use device_code::{AccountStore, DeviceCodeProvider, OAuthTransport, ReqwestTransport};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("client id or authority is not set")]
    NotConfigured,

    #[error("token request failed: {0}")]
    Request(String),

    #[error("identity provider rejected the request: {code}: {description}")]
    Rejected { code: String, description: String },

    #[error("sign-in was not completed before the code expired")]
    Expired,

    #[error("sign-in was declined")]
    Declined,

    #[error("account cache error: {0}")]
    Cache(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// A token is unusable from its expiry instant onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at || self.value.trim().is_empty()
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Return a fresh token: silently when a cached account can be renewed,
    /// interactively otherwise.
    async fn acquire(&self, scopes: &[String]) -> Result<AccessToken, AuthError>;
}
