//! Bounded-length digests via structured LLM calls.
//!
//! Summarization degrades, never fails: any sub-call failure falls back to
//! the text it was asked to summarize (or a truncated excerpt of it).

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::{extract, LanguageModel};
use crate::normalize::{truncate_chars, word_count};

/// Inputs at or below this word count are returned unchanged; the round-trip
/// is not worth it.
pub const MIN_SUMMARY_WORDS: usize = 40;
/// Character budget for the prompt payload. The fallback value stays the
/// untruncated original.
pub const MAX_PROMPT_CHARS: usize = 6000;
/// Per-chunk budget in map-reduce mode.
pub const CHUNK_CHARS: usize = 4000;
/// Raw-excerpt length used when a single chunk's summarization fails.
const CHUNK_FALLBACK_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMode {
    SinglePass,
    MapReduce,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SummaryOutput {
    /// The concise summary of the text.
    summary: String,
}

#[derive(Clone)]
pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Summarize `text` into the target language. Never errors: every
    /// failure path returns the input (or partial summaries) instead.
    pub async fn summarize(&self, text: &str, target_language: &str, mode: SummaryMode) -> String {
        if word_count(text) <= MIN_SUMMARY_WORDS {
            debug!(
                words = word_count(text),
                "input below summary threshold, returning unchanged"
            );
            return text.to_string();
        }

        match mode {
            SummaryMode::SinglePass => self
                .single_pass(text, target_language)
                .await
                .unwrap_or_else(|| text.to_string()),
            SummaryMode::MapReduce => self.map_reduce(text, target_language).await,
        }
    }

    /// One structured call. `None` when the call fails or the reply is
    /// empty; the caller picks the fallback value.
    async fn single_pass(&self, text: &str, target_language: &str) -> Option<String> {
        let payload = truncate_chars(text, MAX_PROMPT_CHARS);
        let system = format!(
            "You are an expert text summarizer. Write a concise, accurate summary of \
             4 to 7 sentences in {target_language}, capturing the main points and key \
             information."
        );
        let user = format!("Summarize the following text concisely:\n\n{payload}");

        match extract::<SummaryOutput>(self.model.as_ref(), &system, &user, 1).await {
            Ok(out) => {
                let summary = out.summary.trim();
                if summary.is_empty() {
                    warn!("summarizer returned an empty summary");
                    None
                } else {
                    debug!(chars = summary.len(), "summary generated");
                    Some(summary.to_string())
                }
            }
            Err(e) => {
                warn!(error = %e, "summarization call failed");
                None
            }
        }
    }

    /// Paragraph-aligned chunking, per-chunk summaries with raw-excerpt
    /// fallback, then one reduce pass over the concatenation. If the reduce
    /// pass fails the concatenated partials are returned verbatim.
    async fn map_reduce(&self, text: &str, target_language: &str) -> String {
        let chunks = split_into_chunks(text, CHUNK_CHARS);
        debug!(chunks = chunks.len(), "map-reduce summarization");

        let mut partials = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            match self.single_pass(chunk, target_language).await {
                Some(summary) => partials.push(summary),
                None => partials.push(truncate_chars(chunk, CHUNK_FALLBACK_CHARS)),
            }
        }

        let combined = partials.join("\n\n");
        self.single_pass(&combined, target_language)
            .await
            .unwrap_or(combined)
    }
}

/// Split on paragraph boundaries into chunks of at most `max_chars`
/// characters. A single oversized paragraph is hard-split.
pub(crate) fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split('\n').filter(|p| !p.trim().is_empty()) {
        if paragraph.chars().count() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let mut rest: Vec<char> = paragraph.chars().collect();
            while !rest.is_empty() {
                let take = rest.len().min(max_chars);
                chunks.push(rest.drain(..take).collect());
            }
            continue;
        }

        let needed = paragraph.chars().count() + if current.is_empty() { 0 } else { 1 };
        if current.chars().count() + needed > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
