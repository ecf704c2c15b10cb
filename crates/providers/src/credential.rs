//! Credential sources backed by configuration.

use async_trait::async_trait;
use ragline_config::StorageConfig;
use ragline_core::credential::{AccessToken, CredentialSource};
use ragline_core::error::CredentialError;
use tracing::debug;

/// Hands out a pre-issued storage token (e.g. a SAS query string) for any scope.
pub struct StaticCredential {
    token: Option<String>,
}

impl StaticCredential {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub fn from_storage(storage: &StorageConfig) -> Self {
        Self::new(storage.access_token.clone())
    }
}

#[async_trait]
impl CredentialSource for StaticCredential {
    async fn get_access_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        debug!(scope, "Issuing static access token");
        match &self.token {
            Some(token) if !token.is_empty() => Ok(AccessToken {
                token: token.trim_start_matches('?').to_string(),
                expires_at: None,
            }),
            _ => Err(CredentialError::Unavailable(format!(
                "no access token configured for scope {scope}"
            ))),
        }
    }
}
