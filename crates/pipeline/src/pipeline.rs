//! The reply orchestrator.

use ragline_config::{AppConfig, ExperimentsConfig, PipelineConfig};
use ragline_core::chat::{ApproachResponse, ChatTurn, RequestOverrides, RetrievalMode, SessionId};
use ragline_core::credential::CredentialSource;
use ragline_core::error::{ReplyError, Result, RetrievalError};
use ragline_core::event::{NoopSink, TelemetryEvent, TelemetrySink};
use ragline_core::provider::{EmbeddingRequest, Provider};
use ragline_core::retrieval::{DocumentRecord, ImageVectorizer, Retriever, SupportingImageRecord};
use ragline_core::variant::VariantProvider;
use ragline_telemetry::events;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::answer::{AnswerGenerator, AnswerOutcome};
use crate::config_resolver::{ConfigResolver, StaticVariants};
use crate::followup::{FollowupGenerator, append_followups};
use crate::query_planner::QueryPlanner;

/// Race a step against cancellation. Cancellation wins ties, so a token that
/// is already cancelled stops the step before it is first polled.
async fn guard<T>(cancel: &CancellationToken, step: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReplyError::Cancelled),
        result = step => result,
    }
}

/// Builder for [`ReplyPipeline`].
pub struct ReplyPipelineBuilder {
    provider: Arc<dyn Provider>,
    retriever: Arc<dyn Retriever>,
    vectorizer: Option<Arc<dyn ImageVectorizer>>,
    credentials: Option<Arc<dyn CredentialSource>>,
    variants: Arc<dyn VariantProvider>,
    experiments: ExperimentsConfig,
    telemetry: Arc<dyn TelemetrySink>,
    models: PipelineConfig,
    citation_base_url: String,
}

impl ReplyPipelineBuilder {
    /// Take models, experiments, variants and the citation base URL from config.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.models = config.pipeline.clone();
        self.experiments = config.experiments.clone();
        self.variants = Arc::new(StaticVariants::from_experiments(&config.experiments));
        self.citation_base_url = config.storage.citation_base_url();
        self
    }

    /// Enables image retrieval. Images also need [`credentials`](Self::credentials).
    pub fn image_vectorizer(mut self, vectorizer: Arc<dyn ImageVectorizer>) -> Self {
        self.vectorizer = Some(vectorizer);
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn variants(mut self, variants: Arc<dyn VariantProvider>) -> Self {
        self.variants = variants;
        self
    }

    pub fn experiments(mut self, experiments: ExperimentsConfig) -> Self {
        self.experiments = experiments;
        self
    }

    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.models.embedding_model = model.into();
        self
    }

    pub fn query_model(mut self, model: impl Into<String>, temperature: f32) -> Self {
        self.models.query_model = model.into();
        self.models.query_temperature = temperature;
        self
    }

    pub fn citation_base_url(mut self, url: impl Into<String>) -> Self {
        self.citation_base_url = url.into();
        self
    }

    pub fn build(self) -> ReplyPipeline {
        let mut answers = AnswerGenerator::new(self.provider.clone(), self.telemetry.clone());
        if let Some(credentials) = self.credentials {
            answers = answers.with_credentials(credentials);
        }

        ReplyPipeline {
            planner: QueryPlanner::new(
                self.provider.clone(),
                self.models.query_model,
                self.models.query_temperature,
            ),
            resolver: ConfigResolver::new(self.variants, self.experiments),
            answers,
            followups: FollowupGenerator::new(self.provider.clone()),
            provider: self.provider,
            retriever: self.retriever,
            vectorizer: self.vectorizer,
            telemetry: self.telemetry,
            embedding_model: self.models.embedding_model,
            citation_base_url: self.citation_base_url,
        }
    }
}

/// Retrieve-then-read reply pipeline.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct ReplyPipeline {
    provider: Arc<dyn Provider>,
    retriever: Arc<dyn Retriever>,
    vectorizer: Option<Arc<dyn ImageVectorizer>>,
    planner: QueryPlanner,
    resolver: ConfigResolver,
    answers: AnswerGenerator,
    followups: FollowupGenerator,
    telemetry: Arc<dyn TelemetrySink>,
    embedding_model: String,
    citation_base_url: String,
}

impl ReplyPipeline {
    pub fn builder(provider: Arc<dyn Provider>, retriever: Arc<dyn Retriever>) -> ReplyPipelineBuilder {
        ReplyPipelineBuilder {
            provider,
            retriever,
            vectorizer: None,
            credentials: None,
            variants: Arc::new(StaticVariants::default()),
            experiments: ExperimentsConfig::default(),
            telemetry: Arc::new(NoopSink),
            models: PipelineConfig::default(),
            citation_base_url: String::new(),
        }
    }

    /// Whether image retrieval is wired in.
    pub fn supports_images(&self) -> bool {
        self.vectorizer.is_some()
    }

    /// Answer the latest turn of `history`.
    ///
    /// Fails with [`ReplyError::EmptyHistory`] before touching any
    /// collaborator when the history is empty or its last question is blank.
    /// A rate-limited or unparsable answer still returns `Ok`, with an
    /// apology as the answer.
    pub async fn reply(
        &self,
        history: &[ChatTurn],
        overrides: Option<&RequestOverrides>,
        session: &SessionId,
        cancel: &CancellationToken,
    ) -> Result<ApproachResponse> {
        let Some(question) = history
            .last()
            .map(|turn| turn.user.as_str())
            .filter(|q| !q.trim().is_empty())
        else {
            warn!(%session, turns = history.len(), "Rejecting reply without a question");
            return Err(ReplyError::EmptyHistory);
        };

        let defaults = RequestOverrides::default();
        let overrides = overrides.unwrap_or(&defaults);
        let started = Instant::now();

        info!(
            %session,
            turns = history.len(),
            mode = %overrides.retrieval_mode(),
            top = overrides.top(),
            "Reply started"
        );

        match self.run(history, question, overrides, session, cancel).await {
            Ok((response, outcome)) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                info!(%session, outcome = outcome.as_str(), duration_ms, "Reply completed");
                self.telemetry.emit(
                    TelemetryEvent::new(events::REPLY_COMPLETED)
                        .with("session_id", session)
                        .with("outcome", outcome.as_str())
                        .with("documents", response.data_points.len())
                        .with("duration_ms", duration_ms),
                );
                Ok(response)
            }
            Err(e) => {
                warn!(%session, error = %e, "Reply failed");
                self.telemetry.emit(
                    TelemetryEvent::new(events::REPLY_FAILED)
                        .with("session_id", session)
                        .with("error", &e)
                        .with("retryable", e.is_retryable()),
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        history: &[ChatTurn],
        question: &str,
        overrides: &RequestOverrides,
        session: &SessionId,
        cancel: &CancellationToken,
    ) -> Result<(ApproachResponse, AnswerOutcome)> {
        let mode = overrides.retrieval_mode();

        let embedding = if mode != RetrievalMode::Text {
            let vector = guard(cancel, self.embed(question)).await?;
            self.step(session, "embedding", |e| e.with("dimensions", vector.len()));
            Some(vector)
        } else {
            None
        };

        let query = guard(cancel, self.planner.plan_query(history, mode)).await?;
        if query.is_some() {
            self.step(session, "query", |e| e);
        }

        let (documents, images) = guard(
            cancel,
            self.retrieve(question, query.as_deref(), embedding.as_deref(), overrides),
        )
        .await?;
        self.step(session, "retrieval", |e| {
            e.with("documents", documents.len())
                .with("images", images.as_ref().map_or(0, Vec::len))
        });

        let mut config = guard(cancel, async { Ok(self.resolver.resolve().await) }).await?;
        if let Some(temperature) = overrides.temperature {
            debug!(temperature, "Request overrides variant temperature");
            config.temperature = temperature;
        }
        self.step(session, "config", |e| e.with("model", &config.model_id));

        let generated = guard(
            cancel,
            self.answers
                .generate(history, &documents, images.as_deref(), &config, session),
        )
        .await?;
        self.step(session, "answer", |e| e.with("outcome", generated.outcome.as_str()));

        let mut answer = generated.answer;
        if overrides.suggest_followup_questions() {
            let questions = guard(cancel, self.followups.generate(&answer, &config)).await?;
            append_followups(&mut answer, &questions);
            self.step(session, "followups", |e| e.with("count", questions.len()));
        }

        Ok((
            ApproachResponse {
                data_points: documents,
                images,
                answer,
                thoughts: generated.thoughts,
                citation_base_url: self.citation_base_url.clone(),
            },
            generated.outcome,
        ))
    }

    async fn embed(&self, question: &str) -> Result<Vec<f32>> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![question.to_string()],
            })
            .await
            .map_err(|e| ReplyError::Embedding(e.to_string()))?;

        response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ReplyError::Embedding("provider returned an empty embedding".into()))
    }

    /// Documents and (when capable) images, fetched concurrently.
    async fn retrieve(
        &self,
        question: &str,
        query: Option<&str>,
        embedding: Option<&[f32]>,
        overrides: &RequestOverrides,
    ) -> Result<(Vec<DocumentRecord>, Option<Vec<SupportingImageRecord>>)> {
        let documents = self.retriever.query_documents(query, embedding, overrides);
        let images = self.retrieve_images(question, query, overrides);
        Ok(futures::try_join!(documents, images)?)
    }

    async fn retrieve_images(
        &self,
        question: &str,
        query: Option<&str>,
        overrides: &RequestOverrides,
    ) -> std::result::Result<Option<Vec<SupportingImageRecord>>, RetrievalError> {
        let Some(vectorizer) = &self.vectorizer else {
            return Ok(None);
        };
        let vector = vectorizer.vectorize_text(query.unwrap_or(question)).await?;
        let images = self.retriever.query_images(query, &vector, overrides).await?;
        Ok(Some(images))
    }

    fn step(
        &self,
        session: &SessionId,
        step: &str,
        detail: impl FnOnce(TelemetryEvent) -> TelemetryEvent,
    ) {
        debug!(%session, step, "Reply step done");
        self.telemetry.emit(detail(
            TelemetryEvent::new(events::REPLY_STEP)
                .with("session_id", session)
                .with("step", step),
        ));
    }
}
