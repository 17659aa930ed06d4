//! The fact-check core shared by the task runner and the synchronous
//! `verify` path: prepare the claim text, consult the cache, classify, and
//! assemble the persisted record.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use claimlens_common::{fingerprint, ClaimInput, ClaimLensError, FactCheckLabel, FactCheckRecord};

use crate::archive::{is_safe, Archiver};
use crate::classify::{sanitize_sources, ClaimClassifier};
use crate::normalize::normalize;
use crate::store::CheckStore;
use crate::summarize::{Summarizer, SummaryMode, MAX_PROMPT_CHARS};
use crate::translate::{to_english, Translator};

pub struct FactChecker {
    translator: Arc<dyn Translator>,
    summarizer: Summarizer,
    classifier: ClaimClassifier,
    archiver: Arc<dyn Archiver>,
    store: Arc<dyn CheckStore>,
}

impl FactChecker {
    pub fn new(
        translator: Arc<dyn Translator>,
        summarizer: Summarizer,
        classifier: ClaimClassifier,
        archiver: Arc<dyn Archiver>,
        store: Arc<dyn CheckStore>,
    ) -> Self {
        Self {
            translator,
            summarizer,
            classifier,
            archiver,
            store,
        }
    }

    /// Normalize, translate, and summarize the input content in place.
    /// Returns the cache fingerprint, computed over the normalized
    /// pre-summarization text so summarizer non-determinism cannot split
    /// cache keys.
    pub async fn prepare(&self, input: &mut ClaimInput) -> Result<String, ClaimLensError> {
        let normalized = normalize(&input.content)?;
        let key = fingerprint(&normalized, input.url.as_ref());

        let english = to_english(self.translator.as_ref(), &normalized).await?;

        // Oversized inputs would lose their tail to prompt truncation, so
        // they go through the chunked path instead.
        let mode = if english.chars().count() > MAX_PROMPT_CHARS {
            SummaryMode::MapReduce
        } else {
            SummaryMode::SinglePass
        };
        input.content = self.summarizer.summarize(&english, "English", mode).await;

        Ok(key)
    }

    /// Cache-or-classify. Returns the record and whether it was served from
    /// the cache.
    pub async fn check(
        &self,
        input: &ClaimInput,
        key: &str,
    ) -> Result<(FactCheckRecord, bool), ClaimLensError> {
        if let Some(cached) = self.store.cached_fact(key).await {
            info!(fingerprint = key, "fact-check served from cache");
            return Ok((cached, true));
        }

        let verdict = self.classifier.classify(&input.content).await;
        let references = sanitize_sources(&verdict.sources);

        // archive is attempted iff the claim did not check out and we have a
        // source URL to snapshot; a failed snapshot is not fatal.
        let archive = match (&input.url, verdict.label) {
            (Some(url), label) if label != FactCheckLabel::Correct => {
                match self.archiver.archive(url.as_str()).await {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        warn!(url = %url, error = %e, "archival failed");
                        None
                    }
                }
            }
            _ => None,
        };

        let record = FactCheckRecord {
            url: input.url.clone(),
            label: verdict.label,
            summary: input.content.clone(),
            response: verdict.explanation,
            is_safe: input.url.as_ref().map(is_safe).unwrap_or(false),
            archive,
            references,
            updated_at: Utc::now(),
        };

        Ok((record, false))
    }

    /// Synchronous fact-check: the full pipeline without task indirection,
    /// for callers willing to block on the result.
    pub async fn verify(&self, mut input: ClaimInput) -> Result<FactCheckRecord, ClaimLensError> {
        let key = self.prepare(&mut input).await?;
        let (record, cached) = self.check(&input, &key).await?;

        if !cached {
            self.store.put_fact(&key, &record).await;
        }

        Ok(record)
    }
}
