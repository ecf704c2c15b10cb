//! Grounded answer generation.
//!
//! ```text
//! Planning -> GroundingBuilt -> CompletionRequested -> Healed -> Parsed -> Prefixed -> Done
//!                                       |                 |
//!                                       +--(rate limit)---+--(unparsable)--> FallbackAnswer -> Prefixed
//! ```
//!
//! A rate limit or unparsable output is not an error: the caller gets a fixed
//! apology as the answer and the diagnostic in `thoughts`, marked
//! [`AnswerOutcome::Recovered`]. Every other provider failure is fatal.

use ragline_core::chat::{ChatTurn, SessionId};
use ragline_core::credential::CredentialSource;
use ragline_core::error::{CredentialError, ReplyError, Result};
use ragline_core::event::{TelemetryEvent, TelemetrySink};
use ragline_core::message::{ContentPart, Message};
use ragline_core::provider::{Provider, ProviderRequest};
use ragline_core::retrieval::{DocumentRecord, SupportingImageRecord};
use ragline_telemetry::events;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config_resolver::GenerationConfig;
use crate::heal::heal;
use crate::prompts::{ANSWER_SYSTEM_PROMPT, image_grounding, render_documents, text_grounding};

pub const RATE_LIMIT_APOLOGY: &str = "The squirrels are taking a breather.  Come back soon.";
pub const MALFORMED_APOLOGY: &str = "The squirrels are out to lunch.  Come back soon.";

/// Scope requested for the token appended to image URLs.
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerState {
    Planning,
    GroundingBuilt,
    CompletionRequested,
    Healed,
    Parsed,
    FallbackAnswer,
    Prefixed,
    Done,
}

struct StateTrace(AnswerState);

impl StateTrace {
    fn advance(&mut self, next: AnswerState) {
        debug!(from = ?self.0, to = ?next, "Answer state");
        self.0 = next;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryReason {
    RateLimited,
    Malformed,
}

/// How the answer was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Parsed,
    Recovered { reason: RecoveryReason },
}

impl AnswerOutcome {
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Recovered { .. } => "recovered",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    /// Prefixed answer text.
    pub answer: String,
    pub thoughts: String,
    pub outcome: AnswerOutcome,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnswerPayload {
    answer: String,
    thoughts: String,
}

impl AnswerPayload {
    fn apology(answer: &str, diagnostic: impl std::fmt::Display) -> Self {
        Self {
            answer: answer.to_string(),
            thoughts: format!("JSON malformed. {diagnostic}"),
        }
    }

    /// Parse healed output; both fields must be non-blank strings.
    fn parse(healed: &str) -> Option<Self> {
        serde_json::from_str::<Self>(healed)
            .ok()
            .filter(|p| !p.answer.trim().is_empty() && !p.thoughts.trim().is_empty())
    }
}

/// Builds the grounded prompt, calls the model, and interprets its JSON.
pub struct AnswerGenerator {
    provider: Arc<dyn Provider>,
    credentials: Option<Arc<dyn CredentialSource>>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn Provider>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            provider,
            credentials: None,
            telemetry,
        }
    }

    /// Required when images are passed to [`generate`](Self::generate).
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// The final user message carrying the sources.
    ///
    /// With `images` (even an empty list) the message is multimodal and every
    /// image URL gets `?{token}` appended.
    pub async fn build_grounding(
        &self,
        documents: &[DocumentRecord],
        images: Option<&[SupportingImageRecord]>,
    ) -> Result<Message> {
        let sources = render_documents(documents);

        let Some(images) = images else {
            return Ok(Message::user(text_grounding(&sources)));
        };

        let credentials = self.credentials.as_ref().ok_or_else(|| {
            CredentialError::Unavailable("no credential source configured for image URLs".into())
        })?;
        let token = credentials.get_access_token(STORAGE_SCOPE).await?;

        let mut parts = vec![ContentPart::Text {
            text: image_grounding(&sources),
        }];
        parts.extend(images.iter().map(|img| ContentPart::ImageUrl {
            url: format!("{}?{}", img.url, token.token),
        }));
        Ok(Message::user_parts(parts))
    }

    /// System prompt, then every turn (user, then bot if present), then grounding.
    pub fn build_messages(history: &[ChatTurn], grounding: Message) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(Message::system(ANSWER_SYSTEM_PROMPT));
        for turn in history {
            messages.push(Message::user(&turn.user));
            if let Some(bot) = &turn.bot {
                messages.push(Message::assistant(bot));
            }
        }
        messages.push(grounding);
        messages
    }

    pub async fn generate(
        &self,
        history: &[ChatTurn],
        documents: &[DocumentRecord],
        images: Option<&[SupportingImageRecord]>,
        config: &GenerationConfig,
        session: &SessionId,
    ) -> Result<GeneratedAnswer> {
        let mut state = StateTrace(AnswerState::Planning);

        let grounding = self.build_grounding(documents, images).await?;
        state.advance(AnswerState::GroundingBuilt);

        let request = ProviderRequest {
            model: config.model_id.clone(),
            messages: Self::build_messages(history, grounding),
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            stop: vec![],
        };

        state.advance(AnswerState::CompletionRequested);
        let started = Instant::now();
        let completion = self.provider.complete(request).await;
        let latency_ms = started.elapsed().as_millis();

        let (payload, outcome) = match completion {
            Ok(response) => {
                self.emit_latency(session, config, latency_ms);
                let healed = heal(&response.message.content);
                state.advance(AnswerState::Healed);

                match AnswerPayload::parse(&healed) {
                    Some(payload) => {
                        state.advance(AnswerState::Parsed);
                        (payload, AnswerOutcome::Parsed)
                    }
                    None => {
                        state.advance(AnswerState::FallbackAnswer);
                        warn!(%session, output = %healed, "Model output is not a usable answer object");
                        (
                            AnswerPayload::apology(MALFORMED_APOLOGY, &healed),
                            AnswerOutcome::Recovered {
                                reason: RecoveryReason::Malformed,
                            },
                        )
                    }
                }
            }
            Err(e) if e.is_rate_limited() => {
                self.emit_latency(session, config, latency_ms);
                state.advance(AnswerState::FallbackAnswer);
                warn!(%session, error = %e, "Completion rate limited, answering with apology");
                (
                    AnswerPayload::apology(RATE_LIMIT_APOLOGY, &e),
                    AnswerOutcome::Recovered {
                        reason: RecoveryReason::RateLimited,
                    },
                )
            }
            Err(e) => return Err(ReplyError::Generation(e)),
        };

        self.telemetry.emit(
            TelemetryEvent::new(events::JSON)
                .with("Json", serde_json::to_string(&payload).unwrap_or_default()),
        );

        let answer = format!("{}{}", config.answer_prefix, payload.answer);
        state.advance(AnswerState::Prefixed);

        info!(
            %session,
            outcome = outcome.as_str(),
            latency_ms = latency_ms as u64,
            answer_len = answer.len(),
            "Answer generated"
        );
        state.advance(AnswerState::Done);

        Ok(GeneratedAnswer {
            answer,
            thoughts: payload.thoughts,
            outcome,
        })
    }

    fn emit_latency(&self, session: &SessionId, config: &GenerationConfig, latency_ms: u128) {
        self.telemetry.emit(
            TelemetryEvent::new(events::CHAT_LATENCY)
                .with("TargetingId", session)
                .with("MaxTokens", config.max_tokens)
                .with("Temperature", config.temperature)
                .with("ModelId", &config.model_id)
                .with(events::CHAT_LATENCY, latency_ms),
        );
    }
}
