//! The Ragline reply pipeline.
//!
//! One public operation, [`ReplyPipeline::reply`], turns a chat history into a
//! grounded answer:
//!
//! 1. **Embed** the latest question (unless retrieval mode is `text`)
//! 2. **Plan** a search query with one completion (unless mode is `vector`)
//! 3. **Retrieve** documents, and images when an image vectorizer is present
//! 4. **Resolve** generation parameters from feature-flag variants
//! 5. **Generate** a JSON `{answer, thoughts}` reply, healing truncated output
//!    and substituting an apology on rate limits or unparsable output
//! 6. **Suggest** follow-up questions when requested
//!
//! Every external service is a trait from `ragline-core`, injected through
//! [`ReplyPipelineBuilder`].

pub mod answer;
pub mod config_resolver;
pub mod followup;
pub mod heal;
pub mod pipeline;
pub mod prompts;
pub mod query_planner;

pub use answer::{AnswerGenerator, AnswerOutcome, GeneratedAnswer, RecoveryReason};
pub use config_resolver::{ConfigResolver, GenerationConfig, StaticVariants, VariantValue, parse_variant};
pub use followup::{FollowupGenerator, append_followups};
pub use heal::heal;
pub use pipeline::{ReplyPipeline, ReplyPipelineBuilder};
pub use query_planner::QueryPlanner;

#[cfg(test)]
pub(crate) mod test_helpers;
