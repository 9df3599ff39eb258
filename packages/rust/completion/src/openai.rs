//! OpenAI-compatible chat-completions client.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fallacydetector_shared::{Configuration, FallacyDetectorError, Result};

use crate::{BACKEND_STAGE, Completion, CompletionBackend, CompletionRequest};

/// Default OpenAI API root.
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Completion backend speaking the `/chat/completions` protocol.
pub struct OpenAiCompletion {
    http: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl OpenAiCompletion {
    /// Create a client for the public API. Fails when `api_key` cannot be
    /// sent as a bearer token.
    pub fn new(api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
            FallacyDetectorError::config(format!("invalid completion API key: {e}"))
        })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: OPENAI_API_URL.to_string(),
            headers,
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Create a client from validated run configuration.
    pub fn from_config(config: &Configuration) -> Result<Self> {
        let client = Self::new(config.credentials().completion_key())?;
        Ok(client.with_base_url(config.completion_base_url()))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        let started = Instant::now();

        let body = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "chat completion request"
        );

        let response = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                FallacyDetectorError::model(BACKEND_STAGE, format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail: String = detail.chars().take(200).collect();
            return Err(FallacyDetectorError::model(
                BACKEND_STAGE,
                format!("API error ({status}): {detail}"),
            ));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            FallacyDetectorError::model(BACKEND_STAGE, format!("invalid response: {e}"))
        })?;

        let (tokens_in, tokens_out) = chat
            .usage
            .as_ref()
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| FallacyDetectorError::model(BACKEND_STAGE, "no choices in response"))?;

        let completion = Completion {
            text,
            tokens_in,
            tokens_out,
            model: chat.model.unwrap_or_else(|| request.model.clone()),
            latency_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            model = %completion.model,
            tokens_in,
            tokens_out,
            latency_ms = completion.latency_ms,
            "chat completion finished"
        );

        Ok(completion)
    }
}
