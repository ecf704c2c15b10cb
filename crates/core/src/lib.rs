//! # Ragline Core
//!
//! Domain types, collaborator traits, and error definitions for the Ragline
//! retrieval-augmented chat pipeline. This crate has **zero framework
//! dependencies**: it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (completion service, search backend, image
//! vectorizer, credential source, feature-flag provider, telemetry transport)
//! is a trait here. Implementations live in their respective crates. This
//! enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted mock collaborators
//! - Clean dependency graph (all crates depend inward on core)

pub mod chat;
pub mod credential;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod variant;

// Re-export key types at crate root for ergonomics
pub use chat::{ApproachResponse, ChatTurn, RequestOverrides, RetrievalMode, SessionId};
pub use credential::{AccessToken, CredentialSource};
pub use error::{ReplyError, Result};
pub use event::{NoopSink, TelemetryEvent, TelemetrySink};
pub use message::{ContentPart, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use retrieval::{DocumentRecord, ImageVectorizer, Retriever, SupportingImageRecord};
pub use variant::VariantProvider;
