//! LLM provider and credential implementations for Ragline.
//!
//! All providers implement the `ragline_core::Provider` trait.

pub mod credential;
pub mod openai_compat;
pub mod router;

pub use credential::StaticCredential;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
