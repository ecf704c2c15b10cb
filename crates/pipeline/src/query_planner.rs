//! Search-query generation from the latest user turn.

use ragline_core::chat::{ChatTurn, RetrievalMode};
use ragline_core::error::{ReplyError, Result};
use ragline_core::message::Message;
use ragline_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, info};

use crate::prompts::QUERY_SYSTEM_PROMPT;

/// Turns the latest question into a keyword search query with one completion.
pub struct QueryPlanner {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl QueryPlanner {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    /// `Ok(None)` without calling the provider in `vector` mode.
    ///
    /// Only the latest user turn is sent; earlier turns do not shape the query.
    pub async fn plan_query(&self, history: &[ChatTurn], mode: RetrievalMode) -> Result<Option<String>> {
        if mode == RetrievalMode::Vector {
            debug!("Vector retrieval, skipping query generation");
            return Ok(None);
        }

        let question = history
            .last()
            .map(|turn| turn.user.as_str())
            .filter(|q| !q.trim().is_empty())
            .ok_or(ReplyError::EmptyHistory)?;

        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(QUERY_SYSTEM_PROMPT), Message::user(question)],
            temperature: self.temperature,
            max_tokens: None,
            stop: vec![],
        };

        let response = self.provider.complete(request).await?;
        let query = response.message.content.trim();
        if query.is_empty() {
            return Err(ReplyError::QueryGeneration(
                "completion returned no content".into(),
            ));
        }

        info!(query = %query, "Search query generated");
        Ok(Some(query.to_string()))
    }
}
