//! Evidence retrieval: web search, bounded-concurrency page fetches, and
//! size-budgeted evidence records for the classifier.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::normalize::{truncate_chars, truncate_with_ellipsis};
use crate::summarize::{Summarizer, SummaryMode};

pub const DEFAULT_NUM_RESULTS: usize = 3;
pub const MAX_NUM_RESULTS: usize = 5;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

pub const TITLE_MAX_CHARS: usize = 200;
pub const CONTENT_MAX_CHARS: usize = 500;
/// Budget for the serialized batch handed to the classifier.
pub const BATCH_BUDGET_CHARS: usize = 3000;

const FETCH_USER_AGENT: &str = "claimlens-evidence-fetcher/0.1";

/// One retrieved and summarized search result. Ephemeral: lives only within
/// a single classification call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceRecord {
    pub title: String,
    pub link: String,
    pub content: String,
}

// --- WebSearcher ---

#[derive(Debug, Clone)]
pub struct SearchItem {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchItem>>;
}

// --- Google Custom Search ---

const GOOGLE_CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";

pub struct GoogleCseSearcher {
    api_key: String,
    engine_id: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl GoogleCseSearcher {
    pub fn new(api_key: &str, engine_id: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
            http: reqwest::Client::builder()
                .timeout(DEFAULT_FETCH_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl WebSearcher for GoogleCseSearcher {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchItem>> {
        info!(query, num_results, "Google CSE search");

        let response = self
            .http
            .get(GOOGLE_CSE_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", &num_results.to_string()),
            ])
            .send()
            .await
            .context("search API request failed")?
            .error_for_status()
            .context("search API returned an error status")?;

        let data: CseResponse = response
            .json()
            .await
            .context("failed to parse search response")?;

        let results: Vec<SearchItem> = data
            .items
            .into_iter()
            .map(|item| SearchItem {
                title: item.title,
                link: item.link,
                snippet: item.snippet,
            })
            .collect();

        info!(query, count = results.len(), "search complete");
        Ok(results)
    }
}

// --- PageFetcher ---

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page and return its visible text.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Plain HTTP fetcher with Readability text extraction. Non-2xx and
/// timeouts are errors; the per-item fallback lives in the retriever.
pub struct HttpPageFetcher {
    http: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(FETCH_USER_AGENT)
                .build()
                .expect("failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("page fetch failed")?
            .error_for_status()
            .context("page returned an error status")?;

        let html = response.text().await.context("failed to read page body")?;

        let parsed_url = url::Url::parse(url).ok();
        let config = TransformConfig {
            readability: true,
            main_content: true,
            return_format: ReturnFormat::Markdown,
            filter_images: true,
            filter_svg: true,
            clean_html: true,
        };
        let input = TransformInput {
            url: parsed_url.as_ref(),
            content: html.as_bytes(),
            screenshot_bytes: None,
            encoding: None,
            selector_config: None,
            ignore_tags: None,
        };

        let text = transform_content_input(input, &config);

        if text.trim().is_empty() {
            anyhow::bail!("empty content after text extraction");
        }

        Ok(text)
    }
}

// --- Retriever ---

pub struct EvidenceRetriever {
    searcher: std::sync::Arc<dyn WebSearcher>,
    fetcher: std::sync::Arc<dyn PageFetcher>,
    summarizer: Summarizer,
    fetch_permits: Semaphore,
}

impl EvidenceRetriever {
    pub fn new(
        searcher: std::sync::Arc<dyn WebSearcher>,
        fetcher: std::sync::Arc<dyn PageFetcher>,
        summarizer: Summarizer,
        concurrency: usize,
    ) -> Self {
        Self {
            searcher,
            fetcher,
            summarizer,
            fetch_permits: Semaphore::new(concurrency.max(1)),
        }
    }

    /// Search, fetch, summarize, and budget evidence for one query.
    ///
    /// Returns the surviving records in original search order plus their
    /// serialized form, guaranteed to fit `BATCH_BUDGET_CHARS`. A failure of
    /// the search API itself degrades to an empty bundle; per-item fetch or
    /// summarization failures degrade to the search snippet.
    pub async fn gather(
        &self,
        query: &str,
        num_results: usize,
    ) -> (Vec<EvidenceRecord>, String) {
        let requested = num_results.clamp(1, MAX_NUM_RESULTS);

        let items = match self.searcher.search(query, requested).await {
            Ok(items) => items,
            Err(e) => {
                warn!(query, error = %e, "search failed, continuing with no evidence");
                Vec::new()
            }
        };

        let usable: Vec<SearchItem> = items
            .into_iter()
            .filter(|item| !item.link.trim().is_empty())
            .take(requested)
            .collect();

        // Concurrent fetches, bounded by the semaphore; join_all preserves
        // the original search-result ordering.
        let records = join_all(usable.iter().map(|item| self.retrieve(item))).await;

        bounded_payload(records)
    }

    async fn retrieve(&self, item: &SearchItem) -> EvidenceRecord {
        let content = match self.page_digest(&item.link).await {
            Ok(digest) => digest,
            Err(e) => {
                debug!(url = %item.link, error = %e, "falling back to search snippet");
                item.snippet.clone()
            }
        };

        EvidenceRecord {
            title: truncate_chars(&item.title, TITLE_MAX_CHARS),
            link: item.link.clone(),
            content: truncate_with_ellipsis(&content, CONTENT_MAX_CHARS),
        }
    }

    async fn page_digest(&self, url: &str) -> Result<String> {
        let _permit = self
            .fetch_permits
            .acquire()
            .await
            .map_err(|_| anyhow::anyhow!("fetch semaphore closed"))?;

        let text = self.fetcher.fetch_text(url).await?;

        Ok(self
            .summarizer
            .summarize(&text, "English", SummaryMode::SinglePass)
            .await)
    }
}

/// Serialize the batch and drop trailing records until it fits the global
/// budget, re-serializing after each drop.
fn bounded_payload(mut records: Vec<EvidenceRecord>) -> (Vec<EvidenceRecord>, String) {
    let mut serialized = serde_json::to_string(&records).unwrap_or_else(|_| "[]".to_string());

    while serialized.len() > BATCH_BUDGET_CHARS && !records.is_empty() {
        records.pop();
        debug!(
            remaining = records.len(),
            "evidence batch over budget, dropping trailing record"
        );
        serialized = serde_json::to_string(&records).unwrap_or_else(|_| "[]".to_string());
    }

    (records, serialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockModel, MockPageFetcher, MockSearcher};
    use std::sync::Arc;

    fn summarizer_with(model: MockModel) -> Summarizer {
        Summarizer::new(Arc::new(model))
    }

    fn item(n: usize) -> SearchItem {
        SearchItem {
            title: format!("Result {n}"),
            link: format!("https://example.com/{n}"),
            snippet: format!("snippet {n}"),
        }
    }

    #[tokio::test]
    async fn per_item_failure_falls_back_to_snippet() {
        let searcher = MockSearcher::returning(vec![item(1), item(2)]);
        // Only the first page is registered; the second fetch fails.
        let fetcher = MockPageFetcher::new().on_page(
            "https://example.com/1",
            "page one text that is quite short",
        );
        let retriever = EvidenceRetriever::new(
            Arc::new(searcher),
            Arc::new(fetcher),
            summarizer_with(MockModel::always(r#"{"summary":"digest"}"#)),
            DEFAULT_FETCH_CONCURRENCY,
        );

        let (records, _) = retriever.gather("query", 2).await;
        assert_eq!(records.len(), 2);
        // Short page skips summarization (identity) but still succeeds.
        assert_eq!(records[0].content, "page one text that is quite short");
        assert_eq!(records[1].content, "snippet 2");
    }

    #[tokio::test]
    async fn ordering_matches_search_results() {
        let searcher = MockSearcher::returning(vec![item(3), item(1), item(2)]);
        let fetcher = MockPageFetcher::new();
        let retriever = EvidenceRetriever::new(
            Arc::new(searcher),
            Arc::new(fetcher),
            summarizer_with(MockModel::failing()),
            2,
        );

        let (records, _) = retriever.gather("query", 3).await;
        let links: Vec<&str> = records.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/3",
                "https://example.com/1",
                "https://example.com/2"
            ]
        );
    }

    #[tokio::test]
    async fn results_without_links_are_dropped() {
        let mut bad = item(1);
        bad.link = "  ".to_string();
        let searcher = MockSearcher::returning(vec![bad, item(2)]);
        let retriever = EvidenceRetriever::new(
            Arc::new(searcher),
            Arc::new(MockPageFetcher::new()),
            summarizer_with(MockModel::failing()),
            DEFAULT_FETCH_CONCURRENCY,
        );

        let (records, _) = retriever.gather("query", 3).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link, "https://example.com/2");
    }

    #[tokio::test]
    async fn search_failure_degrades_to_empty_bundle() {
        let retriever = EvidenceRetriever::new(
            Arc::new(MockSearcher::failing()),
            Arc::new(MockPageFetcher::new()),
            summarizer_with(MockModel::failing()),
            DEFAULT_FETCH_CONCURRENCY,
        );

        let (records, serialized) = retriever.gather("query", 3).await;
        assert!(records.is_empty());
        assert_eq!(serialized, "[]");
    }

    #[tokio::test]
    async fn fields_are_truncated() {
        let long_item = SearchItem {
            title: "t".repeat(400),
            link: "https://example.com/long".to_string(),
            snippet: "s".repeat(900),
        };
        let searcher = MockSearcher::returning(vec![long_item]);
        let retriever = EvidenceRetriever::new(
            Arc::new(searcher),
            Arc::new(MockPageFetcher::new()),
            summarizer_with(MockModel::failing()),
            DEFAULT_FETCH_CONCURRENCY,
        );

        let (records, _) = retriever.gather("query", 1).await;
        assert_eq!(records[0].title.chars().count(), TITLE_MAX_CHARS);
        assert!(records[0].content.ends_with("..."));
        assert_eq!(
            records[0].content.chars().count(),
            CONTENT_MAX_CHARS + 3
        );
    }

    #[test]
    fn batch_budget_drops_trailing_records() {
        let records: Vec<EvidenceRecord> = (0..5)
            .map(|n| EvidenceRecord {
                title: format!("title {n}"),
                link: format!("https://example.com/{n}"),
                content: "c".repeat(900),
            })
            .collect();

        let (kept, serialized) = bounded_payload(records.clone());
        assert!(serialized.len() <= BATCH_BUDGET_CHARS);
        assert!(kept.len() < records.len());
        // Leading records survive; trailing ones are dropped.
        assert_eq!(kept[0], records[0]);
    }

    #[test]
    fn batch_under_budget_is_untouched() {
        let records = vec![EvidenceRecord {
            title: "t".to_string(),
            link: "https://example.com".to_string(),
            content: "short".to_string(),
        }];
        let (kept, serialized) = bounded_payload(records.clone());
        assert_eq!(kept, records);
        assert!(serialized.len() <= BATCH_BUDGET_CHARS);
    }
}
