//! The analysis pipeline: topic → article → bounded text → four model stages.
//!
//! Every run walks the same state machine:
//!
//! `Idle → Searching → Fetching → Normalizing → Summarizing → DetectingFallacies
//! → Explaining → Synthesizing → Completed`
//!
//! Any fault moves the run straight to `Failed`. No later stage runs and the
//! only outcome is an error-shaped [`AnalysisResult`]. Faults never escape a
//! run as `Err`; only construction can fail.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use fallacydetector_completion::{CompletionBackend, OpenAiCompletion};
use fallacydetector_fetch::{ContentGateway, HttpFetcher};
use fallacydetector_search::{SearchGateway, SerperSearch, find_articles};
use fallacydetector_shared::{
    AnalysisReport, AnalysisResult, Article, ArticleRef, Configuration, FallacyDetectorError,
    Result, RunId, Stage, StageOutputs,
};

use crate::reference::FallacyReference;
use crate::stages::{NormalizedText, StageRunner, with_timeout};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Searching,
    Fetching,
    Normalizing,
    Summarizing,
    DetectingFallacies,
    Explaining,
    Synthesizing,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Human-readable label for progress output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Searching => "Searching for articles",
            Self::Fetching => "Fetching article",
            Self::Normalizing => "Preparing article text",
            Self::Summarizing => "Summarizing",
            Self::DetectingFallacies => "Detecting fallacies",
            Self::Explaining => "Writing explanations",
            Self::Synthesizing => "Synthesizing report",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

impl From<Stage> for PipelineState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Summarize => Self::Summarizing,
            Stage::DetectFallacies => Self::DetectingFallacies,
            Stage::Explain => Self::Explaining,
            Stage::Synthesize => Self::Synthesizing,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called on every state transition.
    fn state(&self, state: PipelineState);
    /// Called before the post-search chain starts for one candidate article.
    fn article(&self, hit: &ArticleRef, current: usize, total: usize);
    /// Called once per finished run, success or failure.
    fn done(&self, result: &AnalysisResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn state(&self, _state: PipelineState) {}
    fn article(&self, _hit: &ArticleRef, _current: usize, _total: usize) {}
    fn done(&self, _result: &AnalysisResult) {}
}

/// Orchestrates one or more analysis runs over shared, read-only collaborators.
///
/// Holds no mutable state, so independent runs may execute concurrently on
/// clones of the same pipeline.
#[derive(Clone)]
pub struct AnalysisPipeline {
    config: Arc<Configuration>,
    reference: Arc<FallacyReference>,
    search: Arc<dyn SearchGateway>,
    content: Arc<dyn ContentGateway>,
    backend: Arc<dyn CompletionBackend>,
}

impl AnalysisPipeline {
    /// Build a pipeline with the HTTP-backed collaborators.
    ///
    /// Loads the fallacy reference up front; a malformed table fails here,
    /// before any run can start.
    pub fn new(config: Configuration) -> Result<Self> {
        let reference = FallacyReference::from_config(&config)?;
        let search = SerperSearch::from_config(&config)?;
        let content = HttpFetcher::from_config(&config)?;
        let backend = OpenAiCompletion::from_config(&config)?;

        Ok(Self::with_collaborators(
            config,
            Arc::new(reference),
            Arc::new(search),
            Arc::new(content),
            Arc::new(backend),
        ))
    }

    /// Build a pipeline over caller-supplied collaborators.
    pub fn with_collaborators(
        config: Configuration,
        reference: Arc<FallacyReference>,
        search: Arc<dyn SearchGateway>,
        content: Arc<dyn ContentGateway>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            reference,
            search,
            content,
            backend,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn reference(&self) -> &FallacyReference {
        &self.reference
    }

    /// Analyze the best-ranked article for `topic` within `domain`.
    pub async fn analyze(&self, topic: &str, domain: &str) -> AnalysisResult {
        self.analyze_with_progress(topic, domain, &SilentProgress).await
    }

    /// [`analyze`](Self::analyze) with progress reporting.
    pub async fn analyze_with_progress(
        &self,
        topic: &str,
        domain: &str,
        progress: &dyn ProgressReporter,
    ) -> AnalysisResult {
        let mut results = self.analyze_many(topic, domain, 1, progress).await;
        results.pop().unwrap_or_else(|| {
            AnalysisResult::failed(&FallacyDetectorError::validation("analysis produced no result"))
        })
    }

    /// Analyze up to `max_articles` ranked candidates, one after another.
    ///
    /// One search request is issued. Each candidate then gets its own
    /// short-circuiting run, so one bad article does not stop the others.
    /// A failed or empty search yields exactly one error-shaped result.
    #[instrument(skip_all, fields(topic = %topic, domain = %domain, max_articles = max_articles))]
    pub async fn analyze_many(
        &self,
        topic: &str,
        domain: &str,
        max_articles: usize,
        progress: &dyn ProgressReporter,
    ) -> Vec<AnalysisResult> {
        let started = Instant::now();
        progress.state(PipelineState::Idle);
        progress.state(PipelineState::Searching);

        let search = with_timeout(
            "search",
            self.config.stage_timeout(),
            find_articles(self.search.as_ref(), topic, domain, max_articles.max(1)),
        )
        .await
        .and_then(|r| r);

        let hits = match search {
            Ok(hits) => hits,
            Err(e) => {
                let result = self.fail(e, progress);
                progress.done(&result);
                return vec![result];
            }
        };
        let search_secs = started.elapsed().as_secs_f64();
        info!(count = hits.len(), "articles resolved");

        let total = hits.len();
        let mut results = Vec::with_capacity(total);
        for (i, hit) in hits.iter().enumerate() {
            progress.article(hit, i + 1, total);

            let result = match self.run_article(hit, search_secs, progress).await {
                Ok(report) => {
                    progress.state(PipelineState::Completed);
                    info!(
                        run_id = %report.run_id,
                        url = %report.url,
                        elapsed_ms = (report.processing_time * 1000.0) as u64,
                        "analysis completed"
                    );
                    AnalysisResult::Success(report)
                }
                Err(e) => self.fail(e, progress),
            };
            progress.done(&result);
            results.push(result);
        }

        results
    }

    /// Post-search chain for one candidate. Returns at the first fault.
    async fn run_article(
        &self,
        hit: &ArticleRef,
        search_secs: f64,
        progress: &dyn ProgressReporter,
    ) -> Result<AnalysisReport> {
        let started = Instant::now();
        let timeout = self.config.stage_timeout();

        progress.state(PipelineState::Fetching);
        let raw = with_timeout("fetch", timeout, self.content.fetch(&hit.url)).await??;
        let article = Article::from_ref(hit, raw);

        progress.state(PipelineState::Normalizing);
        let text = NormalizedText::new(&article.raw_content, self.config.article_char_limit());
        if text.is_empty() {
            return Err(FallacyDetectorError::fetch(
                &article.url,
                "article has no readable text",
            ));
        }

        let runner = StageRunner::new(self.backend.as_ref(), &self.config, &self.reference);
        let mut outputs = StageOutputs::new();

        progress.state(Stage::Summarize.into());
        let summary = runner.summarize(&text).await?;
        outputs.record(Stage::Summarize, summary.as_str());

        progress.state(Stage::DetectFallacies.into());
        let findings = runner.detect(&text).await?;
        outputs.record(Stage::DetectFallacies, findings.as_str());

        progress.state(Stage::Explain.into());
        let explanations = runner.explain(&findings).await?;
        outputs.record(Stage::Explain, explanations.as_str());

        progress.state(Stage::Synthesize.into());
        let synthesis = runner.synthesize(&summary, &explanations).await?;
        outputs.record(Stage::Synthesize, synthesis.into_inner());

        Ok(AnalysisReport {
            run_id: RunId::new(),
            title: article.title,
            url: article.url,
            model: self.config.model_id().to_string(),
            content_hash: text.content_hash(),
            stage_outputs: outputs,
            timestamp: Utc::now(),
            processing_time: search_secs + started.elapsed().as_secs_f64(),
        })
    }

    fn fail(&self, err: FallacyDetectorError, progress: &dyn ProgressReporter) -> AnalysisResult {
        warn!(kind = ?err.kind(), error = %err, "analysis failed");
        progress.state(PipelineState::Failed);
        AnalysisResult::failed(&err)
    }
}
