//! Retrieval traits: the search backend as seen by the pipeline.
//!
//! The pipeline never ranks anything itself. It hands a query and/or an
//! embedding to a `Retriever` and uses whatever comes back, in order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chat::RequestOverrides;
use crate::error::RetrievalError;

/// A retrieved text passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Source name, used as the citation key (e.g. "benefits.pdf#page=3")
    pub title: String,

    /// Passage text
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Backend relevance score, if the backend exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl DocumentRecord {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: None,
            score: None,
        }
    }
}

/// A retrieved image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportingImageRecord {
    pub title: String,
    pub url: String,
}

/// Document and image search.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    /// Ranked passages for a query and/or embedding. May be empty.
    async fn query_documents(
        &self,
        query: Option<&str>,
        embedding: Option<&[f32]>,
        overrides: &RequestOverrides,
    ) -> Result<Vec<DocumentRecord>, RetrievalError>;

    /// Ranked images for a query and an image-space embedding.
    ///
    /// Only called when the pipeline was built with an [`ImageVectorizer`].
    async fn query_images(
        &self,
        _query: Option<&str>,
        _embedding: &[f32],
        _overrides: &RequestOverrides,
    ) -> Result<Vec<SupportingImageRecord>, RetrievalError> {
        Ok(Vec::new())
    }
}

/// Projects text into the image embedding space.
#[async_trait]
pub trait ImageVectorizer: Send + Sync {
    async fn vectorize_text(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}
