//! Synchronous fact-check from the command line.
//!
//! Usage: `verify <claim text> [url]`
//!
//! Runs the full pipeline against live services and prints the resulting
//! record as JSON. Requires DATABASE_URL, LLM_API_KEY, GOOGLE_API_KEY, and
//! GOOGLE_CSE_ID in the environment.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use claimlens_common::{ClaimInput, Config};
use claimlens_engine::archive::WaybackArchiver;
use claimlens_engine::evidence::{GoogleCseSearcher, HttpPageFetcher};
use claimlens_engine::store::PgCheckStore;
use claimlens_engine::translate::GoogleWebTranslator;
use claimlens_engine::{ClaimClassifier, EvidenceRetriever, FactChecker, Summarizer};
use llm_client::ChatModel;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let content = args.next().context("usage: verify <claim text> [url]")?;
    let url = args.next().map(|u| u.parse()).transpose()?;

    let config = Config::from_env();
    let fetch_timeout = Duration::from_secs(config.fetch_timeout_secs);

    let pool = PgPool::connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = Arc::new(PgCheckStore::new(pool));
    store.migrate().await?;

    let model = |name: &str| {
        let mut m = ChatModel::new(&config.llm_api_key, name);
        if let Some(base) = &config.llm_base_url {
            m = m.with_base_url(base);
        }
        m
    };

    let summarizer = Summarizer::new(Arc::new(model(&config.summary_model)));
    let retriever = EvidenceRetriever::new(
        Arc::new(GoogleCseSearcher::new(
            &config.google_api_key,
            &config.google_cse_id,
        )),
        Arc::new(HttpPageFetcher::new(fetch_timeout)),
        summarizer.clone(),
        config.fetch_concurrency,
    );
    let classifier = ClaimClassifier::new(
        Arc::new(model(&config.query_model)),
        Arc::new(model(&config.classify_model)),
        retriever,
        config.search_results,
    );
    let checker = FactChecker::new(
        Arc::new(GoogleWebTranslator::new(fetch_timeout)),
        summarizer,
        classifier,
        Arc::new(WaybackArchiver::new()),
        store,
    );

    info!("starting fact check");
    let record = checker.verify(ClaimInput { url, content }).await?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
