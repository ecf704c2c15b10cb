//! Generation parameters from feature-flag variants.
//!
//! Two variants are consulted per reply: `chat_properties` (model, token
//! limit, temperature) and `answer_prefix`. A resolved value is either an
//! inline JSON object or a treatment name such as `on` / `off`, looked up in
//! the `[experiments]` tables. Anything missing, unknown, or unparsable falls
//! back to [`GenerationConfig::default`]; a bad variant never fails a reply.

use async_trait::async_trait;
use ragline_config::{ChatPropertiesConfig, ExperimentsConfig};
use ragline_core::error::VariantError;
use ragline_core::variant::VariantProvider;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const CHAT_PROPERTIES_VARIANT: &str = "chat_properties";
pub const ANSWER_PREFIX_VARIANT: &str = "answer_prefix";

/// Parameters for the answer and follow-up completions of one reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub answer_prefix: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_id: "gpt-4-16k".into(),
            max_tokens: 128,
            temperature: 1.5,
            answer_prefix: String::new(),
        }
    }
}

impl GenerationConfig {
    /// Overlay the fields present (and well-typed) in a JSON object.
    fn apply_object(&mut self, fields: &Map<String, Value>) {
        let field = |camel: &str, snake: &str| fields.get(camel).or_else(|| fields.get(snake));

        if let Some(model) = field("modelId", "model_id").and_then(Value::as_str)
            && !model.is_empty()
        {
            self.model_id = model.to_string();
        }
        if let Some(max) = field("maxTokens", "max_tokens")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
        {
            self.max_tokens = max;
        }
        if let Some(temp) = fields.get("temperature").and_then(Value::as_f64) {
            self.temperature = temp as f32;
        }
        if let Some(prefix) = field("answerPrefix", "answer_prefix").and_then(Value::as_str) {
            self.answer_prefix = prefix.to_string();
        }
    }

    fn apply_properties(&mut self, props: &ChatPropertiesConfig) {
        if let Some(model) = props.model_id.as_deref().filter(|m| !m.is_empty()) {
            self.model_id = model.to_string();
        }
        if let Some(max) = props.max_tokens.filter(|n| *n > 0) {
            self.max_tokens = max;
        }
        if let Some(temp) = props.temperature {
            self.temperature = temp;
        }
    }
}

/// A resolved variant string, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantValue {
    /// An inline JSON object of generation fields.
    Object(Map<String, Value>),
    /// A treatment name, lowercased.
    Treatment(String),
    /// Blank, or JSON that is not an object.
    Empty,
}

/// Classify a resolved variant string.
pub fn parse_variant(raw: &str) -> VariantValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return VariantValue::Empty;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(fields)) => VariantValue::Object(fields),
        // A JSON string is still a treatment name, just quoted.
        Ok(Value::String(s)) if !s.trim().is_empty() => VariantValue::Treatment(s.trim().to_lowercase()),
        Ok(_) => VariantValue::Empty,
        Err(_) if trimmed.starts_with('{') || trimmed.starts_with('[') => VariantValue::Empty,
        Err(_) => VariantValue::Treatment(trimmed.to_lowercase()),
    }
}

fn lookup<'a, T>(table: &'a HashMap<String, T>, treatment: &str) -> Option<&'a T> {
    table
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(treatment))
        .map(|(_, value)| value)
}

/// Resolves a [`GenerationConfig`] for each reply.
pub struct ConfigResolver {
    variants: Arc<dyn VariantProvider>,
    experiments: ExperimentsConfig,
}

impl ConfigResolver {
    pub fn new(variants: Arc<dyn VariantProvider>, experiments: ExperimentsConfig) -> Self {
        Self {
            variants,
            experiments,
        }
    }

    /// Fetch one variant; provider failures are logged and treated as absent.
    async fn fetch(&self, name: &str) -> VariantValue {
        match self.variants.resolve_variant(name).await {
            Ok(Some(raw)) => {
                let value = parse_variant(&raw);
                if value == VariantValue::Empty {
                    warn!(variant = name, "Unusable variant value, using defaults");
                }
                value
            }
            Ok(None) => VariantValue::Empty,
            Err(e) => {
                warn!(variant = name, error = %e, "Variant resolution failed, using defaults");
                VariantValue::Empty
            }
        }
    }

    /// Resolve both variants into a fresh config. Never fails.
    pub async fn resolve(&self) -> GenerationConfig {
        let mut config = GenerationConfig::default();

        match self.fetch(CHAT_PROPERTIES_VARIANT).await {
            VariantValue::Object(fields) => config.apply_object(&fields),
            VariantValue::Treatment(t) => match lookup(&self.experiments.chat_properties, &t) {
                Some(props) => config.apply_properties(props),
                None => warn!(variant = CHAT_PROPERTIES_VARIANT, treatment = %t, "Unknown treatment"),
            },
            VariantValue::Empty => {}
        }

        match self.fetch(ANSWER_PREFIX_VARIANT).await {
            VariantValue::Object(fields) => {
                if let Some(prefix) = fields
                    .get("answerPrefix")
                    .or_else(|| fields.get("answer_prefix"))
                    .and_then(Value::as_str)
                {
                    config.answer_prefix = prefix.to_string();
                }
            }
            VariantValue::Treatment(t) => match lookup(&self.experiments.answer_prefix, &t) {
                Some(prefix) => config.answer_prefix = prefix.clone(),
                None => warn!(variant = ANSWER_PREFIX_VARIANT, treatment = %t, "Unknown treatment"),
            },
            VariantValue::Empty => {}
        }

        debug!(
            model = %config.model_id,
            max_tokens = config.max_tokens,
            temperature = config.temperature,
            prefixed = !config.answer_prefix.is_empty(),
            "Generation config resolved"
        );
        config
    }
}

/// A `VariantProvider` over a fixed name -> value map, e.g. the
/// `[experiments.variants]` table.
#[derive(Debug, Clone, Default)]
pub struct StaticVariants {
    values: HashMap<String, String>,
}

impl StaticVariants {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn from_experiments(experiments: &ExperimentsConfig) -> Self {
        Self::new(experiments.variants.clone())
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl VariantProvider for StaticVariants {
    async fn resolve_variant(&self, name: &str) -> Result<Option<String>, VariantError> {
        Ok(self.values.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FailingVariants;

    fn experiments() -> ExperimentsConfig {
        let mut experiments = ExperimentsConfig::default();
        experiments.chat_properties.insert(
            "on".into(),
            ChatPropertiesConfig {
                model_id: Some("gpt-4-32k".into()),
                max_tokens: Some(512),
                temperature: Some(0.3),
            },
        );
        experiments.chat_properties.insert(
            "off".into(),
            ChatPropertiesConfig {
                max_tokens: Some(256),
                ..Default::default()
            },
        );
        experiments.answer_prefix.insert("on".into(), "[beta] ".into());
        experiments.answer_prefix.insert("off".into(), String::new());
        experiments
    }

    fn resolver(variants: StaticVariants) -> ConfigResolver {
        ConfigResolver::new(Arc::new(variants), experiments())
    }

    #[test]
    fn parse_variant_classifies() {
        assert_eq!(parse_variant("  On "), VariantValue::Treatment("on".into()));
        assert_eq!(parse_variant("\"control\""), VariantValue::Treatment("control".into()));
        assert_eq!(parse_variant(""), VariantValue::Empty);
        assert_eq!(parse_variant("{broken"), VariantValue::Empty);
        assert_eq!(parse_variant("[1,2]"), VariantValue::Empty);
        assert_eq!(parse_variant("42"), VariantValue::Empty);
        assert!(matches!(parse_variant(r#"{"modelId":"m"}"#), VariantValue::Object(_)));
    }

    #[tokio::test]
    async fn no_variants_gives_defaults() {
        let config = resolver(StaticVariants::default()).resolve().await;
        assert_eq!(config, GenerationConfig::default());
        assert_eq!(config.model_id, "gpt-4-16k");
        assert_eq!(config.max_tokens, 128);
        assert!((config.temperature - 1.5).abs() < f32::EPSILON);
        assert_eq!(config.answer_prefix, "");
    }

    #[tokio::test]
    async fn treatment_lookup_is_case_insensitive() {
        let variants = StaticVariants::default()
            .with(CHAT_PROPERTIES_VARIANT, "On")
            .with(ANSWER_PREFIX_VARIANT, "ON");
        let config = resolver(variants).resolve().await;
        assert_eq!(config.model_id, "gpt-4-32k");
        assert_eq!(config.max_tokens, 512);
        assert!((config.temperature - 0.3).abs() < 1e-6);
        assert_eq!(config.answer_prefix, "[beta] ");
    }

    #[tokio::test]
    async fn partial_treatment_falls_back_per_field() {
        let variants = StaticVariants::default().with(CHAT_PROPERTIES_VARIANT, "off");
        let config = resolver(variants).resolve().await;
        assert_eq!(config.model_id, "gpt-4-16k");
        assert_eq!(config.max_tokens, 256);
        assert!((config.temperature - 1.5).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn inline_json_with_mistyped_field() {
        let variants = StaticVariants::default().with(
            CHAT_PROPERTIES_VARIANT,
            r#"{"modelId": "gpt-4o", "maxTokens": "lots", "temperature": 0.2, "answerPrefix": "> "}"#,
        );
        let config = resolver(variants).resolve().await;
        assert_eq!(config.model_id, "gpt-4o");
        assert_eq!(config.max_tokens, 128);
        assert!((config.temperature - 0.2).abs() < 1e-6);
        assert_eq!(config.answer_prefix, "> ");
    }

    #[tokio::test]
    async fn snake_case_json_accepted() {
        let variants = StaticVariants::default()
            .with(CHAT_PROPERTIES_VARIANT, r#"{"model_id": "m", "max_tokens": 64}"#)
            .with(ANSWER_PREFIX_VARIANT, r#"{"answer_prefix": "* "}"#);
        let config = resolver(variants).resolve().await;
        assert_eq!(config.model_id, "m");
        assert_eq!(config.max_tokens, 64);
        assert_eq!(config.answer_prefix, "* ");
    }

    #[tokio::test]
    async fn garbage_and_unknown_treatments_default() {
        let variants = StaticVariants::default()
            .with(CHAT_PROPERTIES_VARIANT, "{not json")
            .with(ANSWER_PREFIX_VARIANT, "treatment-x");
        let config = resolver(variants).resolve().await;
        assert_eq!(config, GenerationConfig::default());
    }

    #[tokio::test]
    async fn provider_failure_is_swallowed() {
        let resolver = ConfigResolver::new(Arc::new(FailingVariants), experiments());
        assert_eq!(resolver.resolve().await, GenerationConfig::default());
    }

    #[tokio::test]
    async fn static_variants_from_experiments() {
        let mut experiments = experiments();
        experiments.variants.insert(ANSWER_PREFIX_VARIANT.into(), "on".into());
        let variants = StaticVariants::from_experiments(&experiments);
        assert_eq!(
            variants.resolve_variant(ANSWER_PREFIX_VARIANT).await.unwrap().as_deref(),
            Some("on")
        );
        assert!(variants.resolve_variant("missing").await.unwrap().is_none());
    }
}
