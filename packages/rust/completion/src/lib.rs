//! Language-model completion backend.
//!
//! Pipeline stages send one prompt per call through [`CompletionBackend`] and
//! receive the complete text back. No streaming and no retries: a call either
//! returns text or fails with [`FallacyDetectorError::ModelInvocation`].

mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use fallacydetector_shared::Result;

pub use openai::OpenAiCompletion;

/// Stage label used by backends before the pipeline attaches the real stage.
pub const BACKEND_STAGE: &str = "completion";

/// One prompt → text request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Text returned by the backend, with usage accounting when available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub model: String,
    pub latency_ms: u64,
}

/// Opaque prompt → completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}
