//! Core orchestration for the fallacy detector.
//!
//! Ties search, fetch, normalization, and the model-backed stages into the
//! [`AnalysisPipeline`], and renders what it produces.

pub mod pipeline;
pub mod prompts;
pub mod reference;
pub mod report;
pub mod stages;

pub use pipeline::{AnalysisPipeline, PipelineState, ProgressReporter, SilentProgress};
pub use reference::FallacyReference;
pub use report::{ReportFormat, render, render_all, render_json};
pub use stages::{Explanations, FallacyFindings, NormalizedText, Summary, Synthesis};
