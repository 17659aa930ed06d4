//! Translation to English with automatic source-language detection.

use std::time::Duration;

use async_trait::async_trait;
use claimlens_common::ClaimLensError;
use tracing::warn;

/// Translator failures split into the "no translation exists" condition,
/// which callers recover from, and everything else.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("no translation found")]
    NotFound,

    #[error("translation failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn to_english(&self, text: &str) -> Result<String, TranslateError>;
}

/// Pipeline semantics on top of a [`Translator`]: "not found" or an empty
/// reply keeps the cleaned original text; any other failure is surfaced as a
/// `Translation` error for the caller to decide on.
pub async fn to_english(
    translator: &dyn Translator,
    cleaned: &str,
) -> Result<String, ClaimLensError> {
    match translator.to_english(cleaned).await {
        Ok(translated) if !translated.trim().is_empty() => Ok(translated),
        Ok(_) => {
            warn!("translator returned an empty result, keeping original text");
            Ok(cleaned.to_string())
        }
        Err(TranslateError::NotFound) => {
            warn!("no translation found, keeping original text");
            Ok(cleaned.to_string())
        }
        Err(TranslateError::Failed(reason)) => Err(ClaimLensError::Translation(reason)),
    }
}

// --- Google web translator ---

const TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

pub struct GoogleWebTranslator {
    http: reqwest::Client,
}

impl GoogleWebTranslator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl Translator for GoogleWebTranslator {
    async fn to_english(&self, text: &str) -> Result<String, TranslateError> {
        let response = self
            .http
            .get(TRANSLATE_URL)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", "en"),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| TranslateError::Failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranslateError::Failed(format!(
                "translate endpoint returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranslateError::Failed(e.to_string()))?;

        // Reply shape: [[["translated", "original", ...], ...], ...]
        let segments = body
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or(TranslateError::NotFound)?;

        let translated: String = segments
            .iter()
            .filter_map(|seg| seg.get(0).and_then(|s| s.as_str()))
            .collect();

        if translated.trim().is_empty() {
            return Err(TranslateError::NotFound);
        }

        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTranslator;

    #[tokio::test]
    async fn successful_translation_is_returned() {
        let translator = MockTranslator::returning("the sky is blue");
        let out = to_english(&translator, "le ciel est bleu").await.unwrap();
        assert_eq!(out, "the sky is blue");
    }

    #[tokio::test]
    async fn not_found_keeps_original() {
        let translator = MockTranslator::not_found();
        let out = to_english(&translator, "already english").await.unwrap();
        assert_eq!(out, "already english");
    }

    #[tokio::test]
    async fn empty_reply_keeps_original() {
        let translator = MockTranslator::returning("   ");
        let out = to_english(&translator, "text").await.unwrap();
        assert_eq!(out, "text");
    }

    #[tokio::test]
    async fn hard_failure_propagates() {
        let translator = MockTranslator::failing("connection reset");
        let err = to_english(&translator, "text").await.unwrap_err();
        assert!(matches!(err, ClaimLensError::Translation(_)));
    }
}
