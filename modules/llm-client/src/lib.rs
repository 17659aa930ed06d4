//! Chat client for OpenAI-compatible completion APIs (Groq, OpenAI).
//!
//! One request per call; callers own their retry budgets. Structured output
//! goes through the `json_schema` response format with schemas derived from
//! `schemars` (see [`StructuredOutput`]).

mod schema;
mod types;

pub use schema::StructuredOutput;
pub use types::{ChatRequest, ChatResponse, WireMessage};

use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use types::{JsonSchemaSpec, ResponseFormat};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// A configured model endpoint: base URL, model identifier, sampling knobs.
#[derive(Clone)]
pub struct ChatModel {
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    http: reqwest::Client,
}

impl ChatModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
            max_tokens: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| anyhow!("LLM_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn completion(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, "chat completion request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat API error ({status}): {body}"));
        }

        let parsed: ChatResponse = response.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("chat API returned no content"))
    }

    /// Plain text completion.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::system(system), WireMessage::user(user)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: None,
        };
        self.completion(&request).await
    }

    /// Structured completion constrained by a JSON schema. Returns the raw
    /// JSON string; callers deserialize and decide what a mismatch means.
    pub async fn structured(
        &self,
        system: &str,
        user: &str,
        schema: serde_json::Value,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::system(system), WireMessage::user(user)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: Some(ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaSpec {
                    name: "structured_response".to_string(),
                    strict: true,
                    schema,
                },
            }),
        };
        self.completion(&request).await
    }

    /// Typed structured completion: generate the schema for `T`, call the
    /// API, deserialize the reply.
    pub async fn extract<T: StructuredOutput>(&self, system: &str, user: &str) -> Result<T> {
        let raw = self.structured(system, user, T::response_schema()).await?;
        serde_json::from_str(&raw).map_err(|e| anyhow!("response did not match schema: {e}"))
    }
}
