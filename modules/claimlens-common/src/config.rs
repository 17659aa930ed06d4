use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // LLM provider (OpenAI-compatible)
    pub llm_api_key: String,
    pub llm_base_url: Option<String>,
    pub query_model: String,
    pub classify_model: String,
    pub summary_model: String,
    pub analysis_model: String,

    // Web search (Google Custom Search)
    pub google_api_key: String,
    pub google_cse_id: String,

    // Evidence retrieval
    pub fetch_concurrency: usize,
    pub fetch_timeout_secs: u64,
    pub search_results: usize,

    // Optional pipeline stages
    pub enable_fallacy_analysis: bool,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            llm_api_key: required_env("LLM_API_KEY"),
            llm_base_url: env::var("LLM_BASE_URL").ok(),
            query_model: env_or("QUERY_MODEL", "llama3-8b-8192"),
            classify_model: env_or("CLASSIFY_MODEL", "deepseek-r1-distill-llama-70b"),
            summary_model: env_or("SUMMARY_MODEL", "llama-3.1-8b-instant"),
            analysis_model: env_or("ANALYSIS_MODEL", "llama3-70b-8192"),
            google_api_key: required_env("GOOGLE_API_KEY"),
            google_cse_id: required_env("GOOGLE_CSE_ID"),
            fetch_concurrency: env_or("FETCH_CONCURRENCY", "8")
                .parse()
                .expect("FETCH_CONCURRENCY must be a number"),
            fetch_timeout_secs: env_or("FETCH_TIMEOUT_SECS", "15")
                .parse()
                .expect("FETCH_TIMEOUT_SECS must be a number"),
            search_results: env_or("SEARCH_RESULTS", "3")
                .parse()
                .expect("SEARCH_RESULTS must be a number"),
            enable_fallacy_analysis: env_or("ENABLE_FALLACY_ANALYSIS", "true") == "true",
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
