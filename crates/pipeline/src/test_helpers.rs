//! Scripted collaborators shared by the pipeline tests.

use async_trait::async_trait;
use ragline_core::chat::RequestOverrides;
use ragline_core::credential::{AccessToken, CredentialSource};
use ragline_core::error::{CredentialError, ProviderError, RetrievalError, VariantError};
use ragline_core::message::Message;
use ragline_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use ragline_core::retrieval::{DocumentRecord, ImageVectorizer, Retriever, SupportingImageRecord};
use ragline_core::variant::VariantProvider;
use std::collections::VecDeque;
use std::sync::Mutex;

type Scripted = Result<ProviderResponse, ProviderError>;

/// Returns scripted completions in order and records every request.
///
/// Running past the end of the script yields a 500 error.
pub struct ScriptedProvider {
    completions: Mutex<VecDeque<Scripted>>,
    embedding: Result<Vec<f32>, ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
    embed_inputs: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            completions: Mutex::new(script.into()),
            embedding: Ok(vec![0.1, 0.2, 0.3]),
            requests: Mutex::new(Vec::new()),
            embed_inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_embedding(mut self, embedding: Result<Vec<f32>, ProviderError>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn complete_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn embed_inputs(&self) -> Vec<String> {
        self.embed_inputs.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.complete_calls() + self.embed_inputs().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(server_error()))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        self.embed_inputs.lock().unwrap().extend(request.inputs);
        self.embedding.clone().map(|v| EmbeddingResponse {
            embeddings: vec![v],
            model: request.model,
            usage: None,
        })
    }
}

/// A completion that never arrives.
pub struct StallingProvider;

#[async_trait]
impl Provider for StallingProvider {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: vec![vec![1.0]],
            model: request.model,
            usage: None,
        })
    }
}

pub fn text(content: &str) -> Scripted {
    Ok(ProviderResponse {
        message: Message::assistant(content),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    })
}

pub fn rate_limited() -> ProviderError {
    ProviderError::RateLimited { retry_after_secs: 5 }
}

pub fn server_error() -> ProviderError {
    ProviderError::ApiError {
        status_code: 500,
        message: "script exhausted".into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentCall {
    pub query: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub top: usize,
}

/// Returns fixed documents and images, recording each call.
#[derive(Default)]
pub struct MockRetriever {
    pub documents: Vec<DocumentRecord>,
    pub images: Vec<SupportingImageRecord>,
    pub fail: bool,
    document_calls: Mutex<Vec<DocumentCall>>,
    image_calls: Mutex<Vec<(Option<String>, Vec<f32>)>>,
}

impl MockRetriever {
    pub fn with_documents(documents: Vec<DocumentRecord>) -> Self {
        Self {
            documents,
            ..Default::default()
        }
    }

    /// Every document query fails with a backend error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn document_calls(&self) -> Vec<DocumentCall> {
        self.document_calls.lock().unwrap().clone()
    }

    pub fn image_calls(&self) -> Vec<(Option<String>, Vec<f32>)> {
        self.image_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    fn name(&self) -> &str {
        "mock"
    }

    async fn query_documents(
        &self,
        query: Option<&str>,
        embedding: Option<&[f32]>,
        overrides: &RequestOverrides,
    ) -> Result<Vec<DocumentRecord>, RetrievalError> {
        self.document_calls.lock().unwrap().push(DocumentCall {
            query: query.map(String::from),
            embedding: embedding.map(<[f32]>::to_vec),
            top: overrides.top(),
        });
        if self.fail {
            return Err(RetrievalError::Backend("index offline".into()));
        }
        Ok(self.documents.clone())
    }

    async fn query_images(
        &self,
        query: Option<&str>,
        embedding: &[f32],
        _overrides: &RequestOverrides,
    ) -> Result<Vec<SupportingImageRecord>, RetrievalError> {
        self.image_calls
            .lock()
            .unwrap()
            .push((query.map(String::from), embedding.to_vec()));
        Ok(self.images.clone())
    }
}

/// Returns a fixed vector and records the texts it was asked to vectorize.
pub struct FixedVectorizer {
    vector: Vec<f32>,
    inputs: Mutex<Vec<String>>,
}

impl FixedVectorizer {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageVectorizer for FixedVectorizer {
    async fn vectorize_text(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        self.inputs.lock().unwrap().push(text.to_string());
        Ok(self.vector.clone())
    }
}

/// Hands out one token and records requested scopes.
pub struct FixedCredential {
    token: String,
    scopes: Mutex<Vec<String>>,
}

impl FixedCredential {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.into(),
            scopes: Mutex::new(Vec::new()),
        }
    }

    pub fn scopes(&self) -> Vec<String> {
        self.scopes.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialSource for FixedCredential {
    async fn get_access_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        self.scopes.lock().unwrap().push(scope.to_string());
        Ok(AccessToken {
            token: self.token.clone(),
            expires_at: None,
        })
    }
}

/// A flag service that is always down.
pub struct FailingVariants;

#[async_trait]
impl VariantProvider for FailingVariants {
    async fn resolve_variant(&self, _name: &str) -> Result<Option<String>, VariantError> {
        Err(VariantError::Unavailable("flag service unreachable".into()))
    }
}
