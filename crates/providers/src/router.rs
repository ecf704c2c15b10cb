//! Provider selection: builds the completion backend from config.

use std::sync::Arc;

use ragline_config::AppConfig;
use ragline_core::provider::Provider;
use tracing::{info, warn};

use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured completion/embedding provider.
///
/// Every supported backend speaks the OpenAI wire format, so the provider
/// name only selects the default base URL.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let api_key = config.api_key.clone().unwrap_or_else(|| {
        if config.provider != "ollama" {
            warn!(provider = %config.provider, "No API key configured");
        }
        String::new()
    });
    let base_url = config.resolved_base_url();

    info!(provider = %config.provider, base_url = %base_url, "Using provider");

    Arc::new(OpenAiCompatProvider::new(
        config.provider.clone(),
        base_url,
        api_key,
    ))
}
