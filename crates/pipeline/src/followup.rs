//! Follow-up question suggestions.
//!
//! Unlike the primary answer, nothing here is recovered: a rate limit, an
//! empty completion, or output that is not a JSON string list fails the reply.

use ragline_core::error::{ReplyError, Result};
use ragline_core::message::Message;
use ragline_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config_resolver::GenerationConfig;
use crate::heal::heal;
use crate::prompts::{FOLLOWUP_SYSTEM_PROMPT, followup_request};

const EXPECTED_QUESTIONS: usize = 3;

pub struct FollowupGenerator {
    provider: Arc<dyn Provider>,
}

impl FollowupGenerator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Ask for three follow-up questions about `answer`, using the same
    /// generation parameters as the answer itself.
    pub async fn generate(&self, answer: &str, config: &GenerationConfig) -> Result<Vec<String>> {
        let request = ProviderRequest {
            model: config.model_id.clone(),
            messages: vec![
                Message::system(FOLLOWUP_SYSTEM_PROMPT),
                Message::user(followup_request(answer)),
            ],
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            stop: vec![],
        };

        let response = self.provider.complete(request).await?;
        let content = response.message.content.trim();
        if content.is_empty() {
            return Err(ReplyError::Followup("completion returned no content".into()));
        }

        let healed = heal(content);
        let questions: Vec<String> = serde_json::from_str(&healed)
            .map_err(|e| ReplyError::Followup(format!("{e}: {healed}")))?;

        if questions.len() != EXPECTED_QUESTIONS {
            warn!(
                expected = EXPECTED_QUESTIONS,
                got = questions.len(),
                "Unexpected number of follow-up questions"
            );
        }
        debug!(count = questions.len(), "Follow-up questions generated");
        Ok(questions)
    }
}

/// Append each question as ` <<question>> `, in order.
pub fn append_followups(answer: &mut String, questions: &[String]) {
    for question in questions {
        answer.push_str(&format!(" <<{question}>> "));
    }
}
