//! Application configuration for the fallacy detector.
//!
//! User config lives at `~/.fallacydetector/fallacydetector.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file: it only names the env vars that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FallacyDetectorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "fallacydetector.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".fallacydetector";

/// User-Agent sent with outbound article requests unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("FallacyDetector/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Config structs (matching fallacydetector.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion backend settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Article fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Pipeline settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model id passed to the completion backend.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature; 0 is deterministic.
    #[serde(default)]
    pub temperature: f32,

    /// Completion length cap per stage.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Name of the env var holding the completion API key.
    #[serde(default = "default_completion_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible API root.
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            temperature: 0.0,
            max_output_tokens: default_max_output_tokens(),
            api_key_env: default_completion_key_env(),
            base_url: default_completion_base_url(),
        }
    }
}

fn default_model() -> String {
    "gpt-4.1-nano".into()
}
fn default_max_output_tokens() -> u32 {
    16_000
}
fn default_completion_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_completion_base_url() -> String {
    "https://api.openai.com/v1".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the search API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Search endpoint URL.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Results requested per query.
    #[serde(default = "default_results_per_query")]
    pub results_per_query: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            endpoint: default_search_endpoint(),
            results_per_query: default_results_per_query(),
        }
    }
}

fn default_search_key_env() -> String {
    "SERPER_API_KEY".into()
}
fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".into()
}
fn default_results_per_query() -> u32 {
    5
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for article requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP timeout for a single article request.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Permit loopback/private targets (local testing only).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_fetch_timeout(),
            allow_private_hosts: false,
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_fetch_timeout() -> u64 {
    30
}

/// `[analysis]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Character budget for normalized article text.
    #[serde(default = "default_article_char_limit")]
    pub article_char_limit: usize,

    /// Upper bound for any single stage.
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_secs: u64,

    /// Candidate articles analyzed per topic.
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,

    /// Optional CSV overriding the built-in fallacy table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallacies_path: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            article_char_limit: default_article_char_limit(),
            stage_timeout_secs: default_stage_timeout(),
            max_articles: default_max_articles(),
            fallacies_path: None,
        }
    }
}

fn default_article_char_limit() -> usize {
    5_000
}
fn default_stage_timeout() -> u64 {
    120
}
fn default_max_articles() -> usize {
    1
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// API keys for the search and completion collaborators.
///
/// Both keys are non-empty and header-safe once constructed.
#[derive(Clone)]
pub struct Credentials {
    search_key: String,
    completion_key: String,
}

impl Credentials {
    /// Validate and wrap the two keys.
    pub fn new(search_key: impl Into<String>, completion_key: impl Into<String>) -> Result<Self> {
        let search_key = search_key.into();
        let completion_key = completion_key.into();

        if completion_key.trim().is_empty() {
            return Err(FallacyDetectorError::config(
                "completion API key required but empty",
            ));
        }
        if search_key.trim().is_empty() {
            return Err(FallacyDetectorError::config(
                "search API key required but empty",
            ));
        }
        check_header_safe("completion", &completion_key)?;
        check_header_safe("search", &search_key)?;

        Ok(Self {
            search_key,
            completion_key,
        })
    }

    /// Read both keys from the environment variables named in `config`.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Resolve both keys through `lookup`, which maps an env var name to its value.
    pub fn from_lookup(
        config: &AppConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let completion_env = &config.model.api_key_env;
        let completion_key = lookup(completion_env)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                FallacyDetectorError::config(format!(
                    "completion API key not found. Set the {completion_env} environment variable."
                ))
            })?;

        let search_env = &config.search.api_key_env;
        let search_key = lookup(search_env)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                FallacyDetectorError::config(format!(
                    "search API key not found. Set the {search_env} environment variable."
                ))
            })?;

        Self::new(search_key, completion_key)
    }

    pub fn search_key(&self) -> &str {
        &self.search_key
    }

    pub fn completion_key(&self) -> &str {
        &self.completion_key
    }
}

/// Keys travel in HTTP headers, which only carry visible ASCII, spaces and tabs.
fn check_header_safe(which: &str, key: &str) -> Result<()> {
    let valid = key.bytes().all(|b| b == b'\t' || (0x20..0x7f).contains(&b));
    if valid {
        Ok(())
    } else {
        Err(FallacyDetectorError::config(format!(
            "{which} API key contains characters not allowed in an HTTP header"
        )))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("search_key", &"<redacted>")
            .field("completion_key", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Configuration (runtime, validated, immutable)
// ---------------------------------------------------------------------------

/// Validated run parameters for one pipeline instance.
#[derive(Debug, Clone)]
pub struct Configuration {
    model_id: String,
    temperature: f32,
    max_output_tokens: u32,
    article_char_limit: usize,
    credentials: Credentials,
    completion_base_url: String,
    search_endpoint: String,
    results_per_query: u32,
    user_agent: String,
    fetch_timeout: Duration,
    allow_private_hosts: bool,
    stage_timeout: Duration,
    max_articles: usize,
    fallacies_path: Option<PathBuf>,
}

impl Configuration {
    /// Build from the file config and resolved credentials, rejecting invalid values.
    pub fn from_app_config(config: &AppConfig, credentials: Credentials) -> Result<Self> {
        let model_id = config.model.default_model.trim().to_string();
        if model_id.is_empty() {
            return Err(FallacyDetectorError::config("model id must not be empty"));
        }

        let temperature = config.model.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(FallacyDetectorError::config(format!(
                "temperature must be within [0, 2], got {temperature}"
            )));
        }

        if config.model.max_output_tokens == 0 {
            return Err(FallacyDetectorError::config(
                "max_output_tokens must be greater than 0",
            ));
        }

        if config.analysis.article_char_limit == 0 {
            return Err(FallacyDetectorError::config(
                "article_char_limit must be greater than 0",
            ));
        }

        if config.analysis.stage_timeout_secs == 0 {
            return Err(FallacyDetectorError::config(
                "stage_timeout_secs must be greater than 0",
            ));
        }

        if config.analysis.max_articles == 0 {
            return Err(FallacyDetectorError::config(
                "max_articles must be at least 1",
            ));
        }

        if config.fetch.user_agent.trim().is_empty() {
            return Err(FallacyDetectorError::config("user_agent must not be empty"));
        }

        Ok(Self {
            model_id,
            temperature,
            max_output_tokens: config.model.max_output_tokens,
            article_char_limit: config.analysis.article_char_limit,
            credentials,
            completion_base_url: config.model.base_url.trim_end_matches('/').to_string(),
            search_endpoint: config.search.endpoint.clone(),
            results_per_query: config.search.results_per_query.max(1),
            user_agent: config.fetch.user_agent.clone(),
            fetch_timeout: Duration::from_secs(config.fetch.timeout_secs),
            allow_private_hosts: config.fetch.allow_private_hosts,
            stage_timeout: Duration::from_secs(config.analysis.stage_timeout_secs),
            max_articles: config.analysis.max_articles,
            fallacies_path: config.analysis.fallacies_path.as_ref().map(PathBuf::from),
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    pub fn article_char_limit(&self) -> usize {
        self.article_char_limit
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn completion_base_url(&self) -> &str {
        &self.completion_base_url
    }

    pub fn search_endpoint(&self) -> &str {
        &self.search_endpoint
    }

    pub fn results_per_query(&self) -> u32 {
        self.results_per_query
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn allow_private_hosts(&self) -> bool {
        self.allow_private_hosts
    }

    pub fn stage_timeout(&self) -> Duration {
        self.stage_timeout
    }

    pub fn max_articles(&self) -> usize {
        self.max_articles
    }

    pub fn fallacies_path(&self) -> Option<&Path> {
        self.fallacies_path.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.fallacydetector/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FallacyDetectorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.fallacydetector/fallacydetector.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content =
        std::fs::read_to_string(path).map_err(|e| FallacyDetectorError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        FallacyDetectorError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    write_default_config(&dir)
}

/// Write a default config file into `dir`, creating it if needed.
pub fn write_default_config(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| FallacyDetectorError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| FallacyDetectorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FallacyDetectorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Load a `.env` file from the working directory, if one exists.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(?path, "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to load .env"),
    }
}
