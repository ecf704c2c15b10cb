//! Configuration loading, validation, and management for Ragline.
//!
//! Loads configuration from `~/.ragline/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragline/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion/embedding endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider name (used for logging and base URL defaults)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the provider base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Document corpus and image search
    #[serde(default)]
    pub search: SearchConfig,

    /// Blob storage location used to build citation links
    #[serde(default)]
    pub storage: StorageConfig,

    /// Static feature-flag variants and their treatment tables
    #[serde(default)]
    pub experiments: ExperimentsConfig,

    /// Telemetry settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_provider() -> String {
    "openai".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("pipeline", &self.pipeline)
            .field("search", &self.search)
            .field("storage", &self.storage)
            .field("experiments", &self.experiments)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Model used for search-query generation
    #[serde(default = "default_query_model")]
    pub query_model: String,

    #[serde(default)]
    pub query_temperature: f32,

    /// Model used for question embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_query_model() -> String {
    "gpt-4-16k".into()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".into()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            query_model: default_query_model(),
            query_temperature: 0.0,
            embedding_model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// JSONL file of documents (`{"title", "content", "category"?, "embedding"?}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_path: Option<String>,

    /// JSONL file of images (`{"title", "url", "embedding"?}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_path: Option<String>,

    /// Embedding model projecting text into image space. Image retrieval is
    /// enabled only when this is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_vectorizer_model: Option<String>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,

    /// Explicit citation base URL; wins over account/container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_base_url: Option<String>,

    /// Static SAS token appended to image URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("account", &self.account)
            .field("container", &self.container)
            .field("citation_base_url", &self.citation_base_url)
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

impl StorageConfig {
    /// Base URL that citation links are resolved against.
    pub fn citation_base_url(&self) -> String {
        if let Some(url) = &self.citation_base_url {
            return url.trim_end_matches('/').to_string();
        }
        match (&self.account, &self.container) {
            (Some(account), Some(container)) => {
                format!("https://{account}.blob.core.windows.net/{container}")
            }
            _ => String::new(),
        }
    }
}

/// Feature-flag variants resolved from the config file.
///
/// ```toml
/// [experiments.variants]
/// chat_properties = "on"
/// answer_prefix = "off"
///
/// [experiments.chat_properties.on]
/// model_id = "gpt-4-32k"
/// max_tokens = 512
/// temperature = 0.3
///
/// [experiments.answer_prefix]
/// on = "[beta] "
/// off = ""
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentsConfig {
    /// Variant name -> resolved value (a treatment name or an inline JSON object)
    #[serde(default)]
    pub variants: HashMap<String, String>,

    /// Treatment -> generation parameters
    #[serde(default)]
    pub chat_properties: HashMap<String, ChatPropertiesConfig>,

    /// Treatment -> answer prefix
    #[serde(default)]
    pub answer_prefix: HashMap<String, String>,
}

/// Generation parameters for one treatment. Unset fields fall back to the
/// pipeline defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatPropertiesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Whether telemetry events are emitted at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Also log every event through `tracing`
    #[serde(default = "default_true")]
    pub log_events: bool,

    /// Events kept in memory for `ragline chat --stats`
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_true() -> bool {
    true
}
fn default_event_capacity() -> usize {
    1_000
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_events: true,
            capacity: default_event_capacity(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ragline/config.toml).
    ///
    /// Also checks environment variables:
    /// - `RAGLINE_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `RAGLINE_BASE_URL`
    /// - `RAGLINE_CHAT_MODEL` (query-generation model)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("RAGLINE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(url) = std::env::var("RAGLINE_BASE_URL") {
            config.base_url = Some(url);
        }

        if let Ok(model) = std::env::var("RAGLINE_CHAT_MODEL") {
            config.pipeline.query_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragline")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.pipeline.query_temperature) {
            return Err(ConfigError::ValidationError(
                "pipeline.query_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        for (treatment, props) in &self.experiments.chat_properties {
            if let Some(t) = props.temperature
                && !(0.0..=2.0).contains(&t)
            {
                return Err(ConfigError::ValidationError(format!(
                    "experiments.chat_properties.{treatment}.temperature must be between 0.0 and 2.0"
                )));
            }
            if props.max_tokens == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "experiments.chat_properties.{treatment}.max_tokens must be > 0"
                )));
            }
        }

        if self.search.image_vectorizer_model.is_some() && self.search.images_path.is_none() {
            return Err(ConfigError::ValidationError(
                "search.image_vectorizer_model requires search.images_path".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Base URL of the completion endpoint.
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| default_base_url(&self.provider))
    }

    /// Generate a default config TOML string (for `onboard` command),
    /// optionally pointing `search.corpus_path` at `corpus`.
    pub fn default_toml(corpus: Option<&str>) -> String {
        let mut config = Self::default();
        config.search.corpus_path = corpus.map(str::to_string);
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            base_url: None,
            pipeline: PipelineConfig::default(),
            search: SearchConfig::default(),
            storage: StorageConfig::default(),
            experiments: ExperimentsConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.pipeline.query_model, "gpt-4-16k");
        assert!(config.telemetry.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.pipeline.embedding_model, config.pipeline.embedding_model);
    }

    #[test]
    fn invalid_query_temperature_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.query_temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_treatment_rejected() {
        let mut config = AppConfig::default();
        config.experiments.chat_properties.insert(
            "on".into(),
            ChatPropertiesConfig {
                max_tokens: Some(0),
                ..Default::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chat_properties.on.max_tokens"));
    }

    #[test]
    fn image_model_requires_images_path() {
        let mut config = AppConfig::default();
        config.search.image_vectorizer_model = Some("clip".into());
        assert!(config.validate().is_err());
        config.search.images_path = Some("images.jsonl".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().provider, "openai");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "provider = [not toml").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn experiments_parsing() {
        let toml_str = r#"
[experiments.variants]
chat_properties = "on"
answer_prefix = "off"

[experiments.chat_properties.on]
model_id = "gpt-4-32k"
max_tokens = 512
temperature = 0.3

[experiments.chat_properties.off]
max_tokens = 256

[experiments.answer_prefix]
on = "[beta] "
off = ""
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.experiments.variants["chat_properties"], "on");
        let on = &config.experiments.chat_properties["on"];
        assert_eq!(on.model_id.as_deref(), Some("gpt-4-32k"));
        assert_eq!(on.max_tokens, Some(512));
        assert_eq!(config.experiments.chat_properties["off"].model_id, None);
        assert_eq!(config.experiments.answer_prefix["on"], "[beta] ");
    }

    #[test]
    fn citation_base_url_from_storage() {
        let storage = StorageConfig {
            account: Some("contoso".into()),
            container: Some("content".into()),
            ..Default::default()
        };
        assert_eq!(
            storage.citation_base_url(),
            "https://contoso.blob.core.windows.net/content"
        );

        let explicit = StorageConfig {
            citation_base_url: Some("https://docs.example.com/".into()),
            ..storage
        };
        assert_eq!(explicit.citation_base_url(), "https://docs.example.com");
        assert_eq!(StorageConfig::default().citation_base_url(), "");
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-secret".into());
        config.storage.access_token = Some("sig=secret".into());
        let out = format!("{config:?}");
        assert!(!out.contains("sk-secret"));
        assert!(!out.contains("sig=secret"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml(None);
        assert!(toml_str.contains("openai"));
        assert!(toml_str.contains("text-embedding-ada-002"));

        let with_corpus = AppConfig::default_toml(Some("/data/corpus.jsonl"));
        let parsed: AppConfig = toml::from_str(&with_corpus).unwrap();
        assert_eq!(parsed.search.corpus_path.as_deref(), Some("/data/corpus.jsonl"));
    }
}
