//! CLI argument definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use fallacydetector_core::{
    AnalysisPipeline, FallacyReference, PipelineState, ProgressReporter, ReportFormat, render_all,
};
use fallacydetector_shared::{
    AnalysisResult, AppConfig, ArticleRef, Configuration, Credentials, init_config, load_config,
    load_config_from, load_dotenv,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Fallacy Detector: find logical fallacies in news articles.
#[derive(Debug, Parser)]
#[command(
    name = "fallacy-detector",
    version,
    about = "AI agent for detecting logical fallacies in news articles.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Search topic for news articles.
    #[arg(required_unless_present_any = ["list_fallacies", "init_config", "show_config"])]
    pub topic: Option<String>,

    /// Domain to search within (e.g. cnn.com).
    #[arg(long, default_value = "")]
    pub domain: String,

    /// Completion model to use (overrides the config file).
    #[arg(long)]
    pub model: Option<String>,

    /// Also write the rendered report to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Number of candidate articles to analyze.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_articles: Option<u32>,

    /// Report format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Alternate config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the fallacy reference table and exit.
    #[arg(long)]
    pub list_fallacies: bool,

    /// Write the default config file and exit.
    #[arg(long)]
    pub init_config: bool,

    /// Print the resolved configuration and exit.
    #[arg(long)]
    pub show_config: bool,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "fallacydetector=info",
        1 => "fallacydetector=debug",
        _ => "fallacydetector=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI.
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    if cli.init_config {
        return cmd_config_init();
    }

    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    apply_overrides(&mut config, &cli);

    if cli.show_config {
        return cmd_config_show(&config);
    }
    if cli.list_fallacies {
        return cmd_list_fallacies(&config);
    }

    let topic = cli
        .topic
        .as_deref()
        .ok_or_else(|| eyre!("a search topic is required"))?;

    cmd_analyze(&cli, &config, topic).await
}

/// Fold CLI flags over the file config. Flags win.
fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(model) = &cli.model {
        config.model.default_model = model.clone();
    }
    if let Some(n) = cli.max_articles {
        config.analysis.max_articles = n as usize;
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_analyze(cli: &Cli, app_config: &AppConfig, topic: &str) -> Result<ExitCode> {
    load_dotenv();
    let credentials = Credentials::from_env(app_config)?;
    let config = Configuration::from_app_config(app_config, credentials)?;

    eprintln!("Analyzing articles for topic: '{topic}'");
    if !cli.domain.is_empty() {
        eprintln!("Searching within domain: {}", cli.domain);
    }
    if cli.verbose > 0 {
        eprintln!("Will analyze up to {} article(s)", config.max_articles());
        eprintln!("Using model: {}", config.model_id());
        eprintln!("Article character limit: {}", config.article_char_limit());
    }

    let max_articles = config.max_articles();
    let pipeline = AnalysisPipeline::new(config)?;
    info!(
        topic,
        domain = %cli.domain,
        fallacies = pipeline.reference().len(),
        "pipeline ready"
    );

    let reporter = CliProgress::new();
    let results = tokio::select! {
        results = pipeline.analyze_many(topic, &cli.domain, max_articles, &reporter) => results,
        _ = tokio::signal::ctrl_c() => {
            reporter.spinner.finish_and_clear();
            eprintln!("\nAnalysis interrupted by user.");
            return Ok(ExitCode::FAILURE);
        }
    };
    reporter.spinner.finish_and_clear();

    let rendered = render_all(&results, cli.format.into())?;
    println!("{rendered}");

    if let Some(path) = &cli.output {
        write_output(path, &rendered)?;
        eprintln!("\nResults saved to: {}", path.display());
    }

    if any_succeeded(&results) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn any_succeeded(results: &[AnalysisResult]) -> bool {
    results.iter().any(AnalysisResult::is_success)
}

fn write_output(path: &Path, rendered: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, rendered).wrap_err_with(|| format!("failed to write {}", path.display()))
}

fn cmd_list_fallacies(config: &AppConfig) -> Result<ExitCode> {
    let reference = match &config.analysis.fallacies_path {
        Some(path) => FallacyReference::load(Path::new(path))?,
        None => FallacyReference::builtin()?,
    };

    println!("Available Fallacies:");
    println!("{}", "=".repeat(50));
    for line in reference.listing() {
        println!("{line}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_init() -> Result<ExitCode> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show(config: &AppConfig) -> Result<ExitCode> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn state(&self, state: PipelineState) {
        if !state.is_terminal() {
            self.spinner.set_message(state.label());
        }
    }

    fn article(&self, hit: &ArticleRef, current: usize, total: usize) {
        self.spinner
            .println(format!("[{current}/{total}] {} ({})", hit.title, hit.url));
    }

    fn done(&self, result: &AnalysisResult) {
        if let Some(error) = result.error() {
            self.spinner.println(format!("  failed: {error}"));
        }
    }
}
