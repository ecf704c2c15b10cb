//! Image-space text vectorizer backed by a provider's embedding endpoint.

use async_trait::async_trait;
use ragline_core::error::RetrievalError;
use ragline_core::provider::{EmbeddingRequest, Provider};
use ragline_core::retrieval::ImageVectorizer;
use std::sync::Arc;
use tracing::debug;

/// Calls `Provider::embed` with a multimodal embedding model.
pub struct EmbeddingVectorizer {
    provider: Arc<dyn Provider>,
    model: String,
}

impl EmbeddingVectorizer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ImageVectorizer for EmbeddingVectorizer {
    async fn vectorize_text(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        debug!(model = %self.model, "Vectorizing text for image search");
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![text.to_string()],
            })
            .await
            .map_err(|e| RetrievalError::Vectorization(e.to_string()))?;

        match response.embeddings.into_iter().next() {
            Some(vector) if !vector.is_empty() => Ok(vector),
            _ => Err(RetrievalError::Vectorization(
                "embedding response contained no vector".into(),
            )),
        }
    }
}
