//! Typed stage records and the model-backed stage bodies.
//!
//! Each stage renders its prompt, makes exactly one completion call bounded by
//! the stage timeout, and wraps the trimmed text in its own record type so the
//! next stage can only consume what it is wired to consume.

use std::future::Future;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use fallacydetector_completion::{CompletionBackend, CompletionRequest};
use fallacydetector_shared::{Configuration, FallacyDetectorError, Result, Stage};

use crate::prompts::{
    self, DETECTION_TEMPLATE, EXPLANATION_TEMPLATE, SUMMARY_TEMPLATE, SYNTHESIS_TEMPLATE,
};
use crate::reference::FallacyReference;

/// Article text after whitespace collapsing and length bounding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn new(raw: &str, limit: usize) -> Self {
        Self(fallacydetector_text::normalize(raw, limit))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hex SHA-256 of the bounded text.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

macro_rules! stage_record {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }
    };
}

stage_record!(
    /// Five-sentence summary of the article.
    Summary
);
stage_record!(
    /// Free-text fallacy findings, or the no-fallacies sentinel.
    FallacyFindings
);
stage_record!(
    /// Educational elaboration of the findings.
    Explanations
);
stage_record!(
    /// Final report text.
    Synthesis
);

/// Runs the model-backed stages against one completion backend.
pub(crate) struct StageRunner<'a> {
    backend: &'a dyn CompletionBackend,
    config: &'a Configuration,
    reference: &'a FallacyReference,
}

impl<'a> StageRunner<'a> {
    pub(crate) fn new(
        backend: &'a dyn CompletionBackend,
        config: &'a Configuration,
        reference: &'a FallacyReference,
    ) -> Self {
        Self {
            backend,
            config,
            reference,
        }
    }

    pub(crate) async fn summarize(&self, text: &NormalizedText) -> Result<Summary> {
        let table = self.reference.render_table();
        let prompt = prompts::render(
            SUMMARY_TEMPLATE,
            &[("fallacies", table.as_str()), ("content", text.as_str())],
        );
        self.invoke(Stage::Summarize, prompt).await.map(Summary)
    }

    pub(crate) async fn detect(&self, text: &NormalizedText) -> Result<FallacyFindings> {
        let table = self.reference.render_table();
        let prompt = prompts::render(
            DETECTION_TEMPLATE,
            &[("fallacies", table.as_str()), ("content", text.as_str())],
        );
        self.invoke(Stage::DetectFallacies, prompt)
            .await
            .map(FallacyFindings)
    }

    pub(crate) async fn explain(&self, findings: &FallacyFindings) -> Result<Explanations> {
        let prompt = prompts::render(
            EXPLANATION_TEMPLATE,
            &[("detected_fallacies", findings.as_str())],
        );
        self.invoke(Stage::Explain, prompt).await.map(Explanations)
    }

    pub(crate) async fn synthesize(
        &self,
        summary: &Summary,
        explanations: &Explanations,
    ) -> Result<Synthesis> {
        let prompt = prompts::render(
            SYNTHESIS_TEMPLATE,
            &[
                ("summary", summary.as_str()),
                ("explanations", explanations.as_str()),
            ],
        );
        self.invoke(Stage::Synthesize, prompt).await.map(Synthesis)
    }

    /// One completion call for `stage`, labelled and bounded.
    async fn invoke(&self, stage: Stage, prompt: String) -> Result<String> {
        let request = CompletionRequest {
            model: self.config.model_id().to_string(),
            prompt,
            temperature: self.config.temperature(),
            max_tokens: self.config.max_output_tokens(),
        };

        info!(%stage, "stage started");
        let started = Instant::now();

        let completion = with_timeout(
            stage.as_str(),
            self.config.stage_timeout(),
            self.backend.complete(&request),
        )
        .await?
        .map_err(|e| relabel(stage, e))?;

        let text = completion.text.trim().to_string();
        debug!(%stage, chars = text.len(), tokens_out = completion.tokens_out, "stage output");
        info!(%stage, elapsed_ms = started.elapsed().as_millis() as u64, "stage completed");
        Ok(text)
    }
}

/// Bound `fut` by `limit`, reporting expiry as a [`FallacyDetectorError::StageTimeout`].
pub(crate) async fn with_timeout<F: Future>(
    stage: &str,
    limit: Duration,
    fut: F,
) -> Result<F::Output> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| FallacyDetectorError::StageTimeout {
            stage: stage.to_string(),
            secs: limit.as_secs(),
        })
}

/// Attach the stage name to backend faults that only know the backend.
fn relabel(stage: Stage, err: FallacyDetectorError) -> FallacyDetectorError {
    match err {
        FallacyDetectorError::ModelInvocation { message, .. } => {
            FallacyDetectorError::model(stage.as_str(), message)
        }
        other => other,
    }
}
