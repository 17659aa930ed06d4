//! Language-model seam for the pipeline.
//!
//! Components depend on [`LanguageModel`] rather than a concrete client so
//! tests can substitute deterministic mocks. `llm_client::ChatModel` is the
//! production implementation.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use llm_client::{ChatModel, StructuredOutput};
use tracing::warn;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// One structured-output completion constrained by `schema`, returning
    /// the raw JSON string.
    async fn structured(
        &self,
        system: &str,
        user: &str,
        schema: serde_json::Value,
    ) -> Result<String>;
}

#[async_trait]
impl LanguageModel for ChatModel {
    async fn structured(
        &self,
        system: &str,
        user: &str,
        schema: serde_json::Value,
    ) -> Result<String> {
        ChatModel::structured(self, system, user, schema).await
    }
}

/// Typed structured call with a fixed attempt budget. A schema mismatch in
/// the reply counts as a failed attempt, same as a transport error.
pub(crate) async fn extract<T: StructuredOutput>(
    model: &dyn LanguageModel,
    system: &str,
    user: &str,
    max_attempts: u32,
) -> Result<T> {
    let schema = T::response_schema();
    let mut last_err = anyhow!("no attempts made");

    for attempt in 1..=max_attempts {
        match model.structured(system, user, schema.clone()).await {
            Ok(raw) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(attempt, error = %e, "structured reply did not match schema");
                    last_err = anyhow!("schema mismatch: {e}");
                }
            },
            Err(e) => {
                warn!(attempt, error = %e, "structured call failed");
                last_err = e;
            }
        }
    }

    Err(last_err)
}
