//! Detects whether input text actually contains a verifiable factual claim.
//!
//! Advisory only: a detector outage must never gate the pipeline, so the
//! failure fallback says "treat it as a claim" with zero confidence.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{extract, LanguageModel};

const SYSTEM_PROMPT: &str = "You decide whether a piece of text contains a verifiable \
    factual claim about the world. Greetings, opinions, slogans, and questions are not \
    claims. Statements that could be checked against evidence are.";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClaimDetection {
    pub is_factual_claim: bool,
    /// 0.0 to 1.0.
    pub confidence: f32,
    pub reasoning: String,
}

pub async fn detect(model: &dyn LanguageModel, text: &str) -> ClaimDetection {
    let user = format!("Text: \"{}\"", text.trim());

    match extract::<ClaimDetection>(model, SYSTEM_PROMPT, &user, 1).await {
        Ok(detection) => detection,
        Err(e) => {
            warn!(error = %e, "claim detection failed, assuming input is a claim");
            ClaimDetection {
                is_factual_claim: true,
                confidence: 0.0,
                reasoning: format!("Claim detection unavailable: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    #[tokio::test]
    async fn parses_detection() {
        let model = MockModel::always(
            r#"{"is_factual_claim":false,"confidence":0.92,"reasoning":"A greeting."}"#,
        );
        let detection = detect(&model, "Hi there!").await;
        assert!(!detection.is_factual_claim);
        assert!(detection.confidence > 0.9);
    }

    #[tokio::test]
    async fn outage_assumes_claim() {
        let model = MockModel::failing();
        let detection = detect(&model, "The Earth is flat.").await;
        assert!(detection.is_factual_claim);
        assert_eq!(detection.confidence, 0.0);
    }
}
