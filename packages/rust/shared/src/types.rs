//! Core domain types shared by the gateways, the pipeline, and the CLI.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FailureKind, FallacyDetectorError};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

/// One ranked hit returned by the search collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub snippet: String,
}

/// A resolved article: search hit plus the fetched raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub raw_content: String,
}

impl Article {
    /// Attach fetched content to a search hit.
    pub fn from_ref(hit: &ArticleRef, raw_content: String) -> Self {
        Self {
            url: hit.url.clone(),
            title: hit.title.clone(),
            raw_content,
        }
    }
}

// ---------------------------------------------------------------------------
// Fallacy taxonomy
// ---------------------------------------------------------------------------

/// A named logical fallacy and its description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallacyDefinition {
    #[serde(rename = "Fallacy")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Model-backed stages of the analysis chain, in execution order.
///
/// `Ord` follows pipeline order, so ordered collections keyed by `Stage`
/// iterate in the order the stages ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "summary")]
    Summarize,
    #[serde(rename = "detected_fallacies")]
    DetectFallacies,
    #[serde(rename = "educational_explanations")]
    Explain,
    #[serde(rename = "synthesized_result")]
    Synthesize,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 4] = [
        Stage::Summarize,
        Stage::DetectFallacies,
        Stage::Explain,
        Stage::Synthesize,
    ];

    /// Key used in serialized stage outputs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarize => "summary",
            Self::DetectFallacies => "detected_fallacies",
            Self::Explain => "educational_explanations",
            Self::Synthesize => "synthesized_result",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text recorded per stage, iterated in pipeline order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageOutputs(BTreeMap<Stage, String>);

impl StageOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the output of `stage`, replacing any earlier value.
    pub fn record(&mut self, stage: Stage, text: impl Into<String>) {
        self.0.insert(stage, text.into());
    }

    pub fn get(&self, stage: Stage) -> Option<&str> {
        self.0.get(&stage).map(String::as_str)
    }

    /// Recorded outputs in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &str)> {
        self.0.iter().map(|(stage, text)| (*stage, text.as_str()))
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.0.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// AnalysisResult
// ---------------------------------------------------------------------------

/// Success shape of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: RunId,
    pub title: String,
    pub url: String,
    /// Completion model that produced the stage outputs.
    pub model: String,
    /// SHA-256 of the normalized article text the stages saw.
    pub content_hash: String,
    pub stage_outputs: StageOutputs,
    pub timestamp: DateTime<Utc>,
    /// Wall-clock seconds for the whole run.
    pub processing_time: f64,
}

/// Error shape of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub error: String,
    pub kind: FailureKind,
}

/// Outcome of one pipeline run: exactly one of report or error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Success(AnalysisReport),
    Failure(AnalysisFailure),
}

impl AnalysisResult {
    /// Convert a stage fault into the error-shaped result.
    pub fn failed(err: &FallacyDetectorError) -> Self {
        Self::Failure(AnalysisFailure {
            error: err.to_string(),
            kind: err.kind(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            Self::Success(report) => Some(report),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(&failure.error),
        }
    }
}
