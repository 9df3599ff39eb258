//! Shared types, error model, and configuration for the fallacy detector.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`FallacyDetectorError`]: the unified error type
//! - Domain types ([`Article`], [`FallacyDefinition`], [`Stage`], [`AnalysisResult`])
//! - Configuration ([`AppConfig`], [`Configuration`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnalysisConfig, AppConfig, Configuration, Credentials, DEFAULT_USER_AGENT, FetchConfig,
    ModelConfig, SearchConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, load_dotenv, write_default_config,
};
pub use error::{FailureKind, FallacyDetectorError, Result};
pub use types::{
    AnalysisFailure, AnalysisReport, AnalysisResult, Article, ArticleRef, FallacyDefinition,
    RunId, Stage, StageOutputs,
};
