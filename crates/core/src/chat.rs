//! Chat request and response value objects.
//!
//! These cross the pipeline's public boundary: the request layer hands in a
//! history of `ChatTurn`s plus optional `RequestOverrides`, and gets back an
//! `ApproachResponse`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::retrieval::{DocumentRecord, SupportingImageRecord};

/// Caller-generated identifier used to correlate telemetry for one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One exchange in the conversation: the user's message and, for every turn
/// but the latest, the bot's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<String>,
}

impl ChatTurn {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            bot: None,
        }
    }

    pub fn answered(user: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            bot: Some(bot.into()),
        }
    }
}

/// How documents are looked up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Keyword query only; no embedding is computed.
    Text,
    /// Embedding only; no search query is generated.
    Vector,
    /// Both.
    #[default]
    Hybrid,
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Vector => write!(f, "vector"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Per-request knobs. Every field is optional; accessors apply the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_mode: Option<RetrievalMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_captions: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_ranker: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggest_followup_questions: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl RequestOverrides {
    pub fn retrieval_mode(&self) -> RetrievalMode {
        self.retrieval_mode.unwrap_or_default()
    }

    pub fn top(&self) -> usize {
        self.top.unwrap_or(3)
    }

    pub fn semantic_captions(&self) -> bool {
        self.semantic_captions.unwrap_or(false)
    }

    pub fn semantic_ranker(&self) -> bool {
        self.semantic_ranker.unwrap_or(false)
    }

    pub fn suggest_followup_questions(&self) -> bool {
        self.suggest_followup_questions.unwrap_or(false)
    }

    /// The category exclusion rendered as a search filter expression.
    pub fn search_filter(&self) -> Option<String> {
        self.exclude_category
            .as_deref()
            .map(|category| format!("category ne '{}'", category.replace('\'', "''")))
    }
}

/// The terminal result of one `reply` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproachResponse {
    pub data_points: Vec<DocumentRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<SupportingImageRecord>>,

    pub answer: String,

    pub thoughts: String,

    pub citation_base_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_defaults() {
        let o = RequestOverrides::default();
        assert_eq!(o.retrieval_mode(), RetrievalMode::Hybrid);
        assert_eq!(o.top(), 3);
        assert!(!o.semantic_captions());
        assert!(!o.semantic_ranker());
        assert!(!o.suggest_followup_questions());
        assert!(o.search_filter().is_none());
        assert!(o.temperature.is_none());
    }

    #[test]
    fn overrides_wire_format() {
        let o: RequestOverrides = serde_json::from_str(
            r#"{"retrievalMode":"vector","top":5,"excludeCategory":"hr","suggestFollowupQuestions":true}"#,
        )
        .unwrap();
        assert_eq!(o.retrieval_mode(), RetrievalMode::Vector);
        assert_eq!(o.top(), 5);
        assert!(o.suggest_followup_questions());
        assert_eq!(o.search_filter().as_deref(), Some("category ne 'hr'"));
    }

    #[test]
    fn search_filter_escapes_quotes() {
        let o = RequestOverrides {
            exclude_category: Some("o'brien".into()),
            ..Default::default()
        };
        assert_eq!(o.search_filter().as_deref(), Some("category ne 'o''brien'"));
    }

    #[test]
    fn chat_turn_parses_without_bot() {
        let turn: ChatTurn = serde_json::from_str(r#"{"user":"What is covered?"}"#).unwrap();
        assert_eq!(turn, ChatTurn::new("What is covered?"));
    }

    #[test]
    fn response_uses_camel_case() {
        let resp = ApproachResponse {
            data_points: vec![],
            images: None,
            answer: "a".into(),
            thoughts: "t".into(),
            citation_base_url: "https://docs".into(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("dataPoints"));
        assert!(json.contains("citationBaseUrl"));
        assert!(!json.contains("images"));
    }
}
