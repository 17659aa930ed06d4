//! Evidence-grounded claim classification.
//!
//! Two-step protocol: formulate one focused search query, then ask a second
//! model for a label + explanation grounded in the retrieved evidence. Both
//! steps have fixed retry budgets and deterministic fallbacks; `classify`
//! never errors.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use claimlens_common::FactCheckLabel;

use crate::evidence::EvidenceRetriever;
use crate::model::{extract, LanguageModel};
use crate::normalize::truncate_chars;

const QUERY_ATTEMPTS: u32 = 2;
const VERDICT_ATTEMPTS: u32 = 3;
const QUERY_FALLBACK_CHARS: usize = 100;

const QUERY_SYSTEM_PROMPT: &str = "You are a fact-check researcher. Frame an appropriate \
    search query to retrieve information helpful for fact-checking the given claim. \
    Return only a simple search query string.";

const VERDICT_SYSTEM_PROMPT: &str = "You are a fact checker. Based on the following claim \
    and search results, classify the claim as exactly one of: 'correct', 'incorrect', or \
    'misleading'. Provide a clear explanation and list any relevant source URLs. Use \
    'correct' for true claims, 'incorrect' for false claims, and 'misleading' for \
    partially true or ambiguous claims.";

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchQueryOutput {
    /// A single focused web search query.
    query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct VerdictOutput {
    /// One of: correct, incorrect, misleading.
    label: String,
    /// Explanation of the verdict, grounded in the evidence.
    explanation: String,
    /// Supporting source URLs.
    sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub label: FactCheckLabel,
    pub explanation: String,
    pub sources: Vec<String>,
}

pub struct ClaimClassifier {
    query_model: Arc<dyn LanguageModel>,
    verdict_model: Arc<dyn LanguageModel>,
    retriever: EvidenceRetriever,
    num_results: usize,
}

impl ClaimClassifier {
    pub fn new(
        query_model: Arc<dyn LanguageModel>,
        verdict_model: Arc<dyn LanguageModel>,
        retriever: EvidenceRetriever,
        num_results: usize,
    ) -> Self {
        Self {
            query_model,
            verdict_model,
            retriever,
            num_results,
        }
    }

    /// Classify a claim against freshly retrieved evidence. Never errors:
    /// total failure yields the deterministic misleading-with-explanation
    /// fallback.
    pub async fn classify(&self, claim: &str) -> ClassificationResult {
        let query = self.formulate_query(claim).await;
        let (records, evidence_json) = self.retriever.gather(&query, self.num_results).await;
        info!(
            query,
            evidence = records.len(),
            "evidence gathered for classification"
        );
        self.grounded_verdict(claim, &evidence_json).await
    }

    async fn formulate_query(&self, claim: &str) -> String {
        match extract::<SearchQueryOutput>(
            self.query_model.as_ref(),
            QUERY_SYSTEM_PROMPT,
            claim,
            QUERY_ATTEMPTS,
        )
        .await
        {
            Ok(out) if !out.query.trim().is_empty() => out.query.trim().to_string(),
            Ok(_) | Err(_) => {
                warn!("query formulation failed, falling back to claim excerpt");
                if claim.trim().is_empty() {
                    "news".to_string()
                } else {
                    truncate_chars(claim, QUERY_FALLBACK_CHARS)
                }
            }
        }
    }

    async fn grounded_verdict(&self, claim: &str, evidence_json: &str) -> ClassificationResult {
        let user = format!(
            "Claim to fact-check: {claim}\n\n\
             Search results for reference:\n{evidence_json}\n\n\
             Please provide:\n\
             1. A classification (correct/incorrect/misleading)\n\
             2. A detailed explanation\n\
             3. Relevant source URLs if available"
        );

        // Each attempt covers the call, the schema check, and the label
        // validation; an unrecognized label burns an attempt too.
        for attempt in 1..=VERDICT_ATTEMPTS {
            match extract::<VerdictOutput>(
                self.verdict_model.as_ref(),
                VERDICT_SYSTEM_PROMPT,
                &user,
                1,
            )
            .await
            {
                Ok(out) => match FactCheckLabel::from_lenient(&out.label) {
                    Some(label) => {
                        return ClassificationResult {
                            label,
                            explanation: out.explanation,
                            sources: out
                                .sources
                                .into_iter()
                                .map(|s| s.trim().to_string())
                                .filter(|s| !s.is_empty())
                                .collect(),
                        }
                    }
                    None => {
                        warn!(attempt, label = %out.label, "classifier returned an unknown label")
                    }
                },
                Err(e) => warn!(attempt, error = %e, "classification attempt failed"),
            }
        }

        warn!("classification exhausted its retry budget, returning fallback");
        ClassificationResult {
            label: FactCheckLabel::Misleading,
            explanation: format!(
                "Unable to complete the fact check due to a technical error. Claim: {claim}"
            ),
            sources: Vec::new(),
        }
    }
}

/// Keep only candidate sources that parse as absolute http/https URLs.
/// Everything else is dropped silently.
pub fn sanitize_sources(sources: &[String]) -> Vec<Url> {
    sources
        .iter()
        .filter_map(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
                _ => {
                    warn!(source = raw, "dropping non-URL source");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::DEFAULT_FETCH_CONCURRENCY;
    use crate::summarize::Summarizer;
    use crate::testing::{MockModel, MockPageFetcher, MockSearcher};

    fn classifier(query_model: MockModel, verdict_model: MockModel) -> ClaimClassifier {
        let retriever = EvidenceRetriever::new(
            Arc::new(MockSearcher::returning(Vec::new())),
            Arc::new(MockPageFetcher::new()),
            Summarizer::new(Arc::new(MockModel::failing())),
            DEFAULT_FETCH_CONCURRENCY,
        );
        ClaimClassifier::new(
            Arc::new(query_model),
            Arc::new(verdict_model),
            retriever,
            3,
        )
    }

    #[tokio::test]
    async fn happy_path_normalizes_synonym_labels() {
        let verdict = MockModel::always(
            r#"{"label":"True","explanation":"Well supported.","sources":["https://a.example/x"]}"#,
        );
        let c = classifier(MockModel::always(r#"{"query":"plant based emissions"}"#), verdict);
        let result = c.classify("Plant-based meats reduce emissions.").await;
        assert_eq!(result.label, FactCheckLabel::Correct);
        assert_eq!(result.explanation, "Well supported.");
        assert_eq!(result.sources, vec!["https://a.example/x".to_string()]);
    }

    #[tokio::test]
    async fn total_outage_returns_deterministic_fallback() {
        let claim = "Plant-based meats reduce greenhouse gas emissions by 98%.";
        let c = classifier(MockModel::failing(), MockModel::failing());
        let result = c.classify(claim).await;
        assert_eq!(result.label, FactCheckLabel::Misleading);
        assert!(result.explanation.contains(claim));
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn unknown_label_burns_attempts_then_falls_back() {
        let verdict = MockModel::always(
            r#"{"label":"unknowable","explanation":"?","sources":[]}"#,
        );
        let c = classifier(MockModel::failing(), verdict);
        let result = c.classify("some claim").await;
        assert_eq!(result.label, FactCheckLabel::Misleading);
        assert!(result.explanation.contains("technical error"));
    }

    #[tokio::test]
    async fn query_fallback_uses_claim_excerpt() {
        let claim = "c".repeat(300);
        let verdict = MockModel::always(
            r#"{"label":"misleading","explanation":"e","sources":[]}"#,
        );
        let c = classifier(MockModel::failing(), verdict);
        let query = c.formulate_query(&claim).await;
        assert_eq!(query.chars().count(), QUERY_FALLBACK_CHARS);
    }

    #[tokio::test]
    async fn empty_claim_queries_for_news() {
        let c = classifier(
            MockModel::failing(),
            MockModel::always(r#"{"label":"misleading","explanation":"e","sources":[]}"#),
        );
        assert_eq!(c.formulate_query("  ").await, "news");
    }

    #[test]
    fn sanitize_drops_non_urls() {
        let sources = vec![
            "https://example.com/a".to_string(),
            "not a url".to_string(),
            "ftp://example.com/file".to_string(),
            "".to_string(),
            "http://example.org/b".to_string(),
        ];
        let clean = sanitize_sources(&sources);
        let as_str: Vec<String> = clean.iter().map(|u| u.to_string()).collect();
        assert_eq!(
            as_str,
            vec![
                "https://example.com/a".to_string(),
                "http://example.org/b".to_string()
            ]
        );
    }
}
