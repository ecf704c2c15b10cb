//! Feature-flag variants.
//!
//! Only the *result* of flag evaluation is consumed: a variant name resolves
//! to an optional string, which the pipeline parses itself.

use async_trait::async_trait;

use crate::error::VariantError;

#[async_trait]
pub trait VariantProvider: Send + Sync {
    /// Resolve `name` to its configured value. `Ok(None)` means the provider
    /// has no variant for this name.
    async fn resolve_variant(&self, name: &str) -> Result<Option<String>, VariantError>;
}
