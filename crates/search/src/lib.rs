//! Retrieval backends for Ragline.
//!
//! `InMemorySearch` serves documents and images from JSON-lines files with
//! keyword, vector, or hybrid (reciprocal rank fusion) lookup.
//! `EmbeddingVectorizer` projects text into image space through a provider's
//! embedding endpoint.

pub mod corpus;
pub mod in_memory;
pub mod vector;
pub mod vectorizer;

pub use corpus::{CorpusDocument, CorpusImage};
pub use in_memory::InMemorySearch;
pub use vector::{cosine_similarity, keyword_score, reciprocal_rank_fusion};
pub use vectorizer::EmbeddingVectorizer;
