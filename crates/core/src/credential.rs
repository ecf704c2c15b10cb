//! Credential source: short-lived access tokens for image URLs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

/// A bearer/SAS token and its expiry, if known.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn get_access_token(&self, scope: &str) -> Result<AccessToken, CredentialError>;
}
