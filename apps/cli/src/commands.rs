//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use outreach_core::{
    BatchOutcome, BatchSummary, ProgressReporter, RunConfig, ledger_path, run_pipeline,
    validate_prospects_csv,
};
use outreach_gateway::{GatewaySettings, HttpGateway};
use outreach_shared::{
    AppConfig, PipelineConfig, ProcessingResult, ProcessingStatus, RunId, init_config, load_config,
    validate_api_key,
};
use outreach_storage::Ledger;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Outreach: research prospects and draft personalised outreach with an LLM gateway.
#[derive(Parser)]
#[command(
    name = "outreach",
    version,
    about = "Research B2B prospects and draft personalised outreach messages in batches.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process a prospect CSV and write research and email reports.
    Run {
        /// CSV with person_name, company_name and optional linkedin_url columns.
        input: PathBuf,

        /// Continue an interrupted run, skipping prospects it already finished.
        #[arg(long, value_name = "RUN_ID")]
        resume: Option<RunId>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Check a prospect CSV without calling the gateway.
    Validate {
        /// CSV file to check.
        input: PathBuf,
    },

    /// List recorded runs.
    Runs {
        /// Output directory holding the run ledger (defaults to config).
        #[arg(long, env = "OUTPUT_DIR")]
        output_dir: Option<String>,

        /// Maximum number of runs to show.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Per-run settings that take precedence over the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct Overrides {
    /// Prospects per chunk.
    #[arg(long, env = "CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// Retries after the first attempt of each gateway call.
    #[arg(long, env = "MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "TIMEOUT_SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Prospects processed at once within a chunk.
    #[arg(long, env = "CONCURRENCY_LIMIT")]
    pub concurrency_limit: Option<usize>,

    /// Gateway base URL.
    #[arg(long, env = "TFY_BASE_URL")]
    pub base_url: Option<String>,

    /// Model identifier on the gateway.
    #[arg(long, env = "TFY_REASONING_MODEL")]
    pub model: Option<String>,

    /// Directory for reports and the run ledger.
    #[arg(long, env = "OUTPUT_DIR")]
    pub output_dir: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(v) = self.chunk_size {
            config.pipeline.chunk_size = v;
        }
        if let Some(v) = self.max_retries {
            config.pipeline.max_retries = v;
        }
        if let Some(v) = self.timeout_seconds {
            config.gateway.timeout_secs = v;
        }
        if let Some(v) = self.concurrency_limit {
            config.pipeline.concurrency_limit = v;
        }
        if let Some(v) = self.base_url {
            config.gateway.base_url = v;
        }
        if let Some(v) = self.model {
            config.gateway.model_id = v;
        }
        if let Some(v) = self.output_dir {
            config.output.output_dir = v;
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "outreach=info",
        1 => "outreach=debug",
        _ => "outreach=trace",
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

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            input,
            resume,
            overrides,
        } => cmd_run(&input, resume, overrides).await,
        Command::Validate { input } => cmd_validate(&input),
        Command::Runs { output_dir, limit } => cmd_runs(output_dir, limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(input: &Path, resume: Option<RunId>, overrides: Overrides) -> Result<()> {
    let mut config = load_config()?;
    overrides.apply(&mut config);

    // Validate settings and the API key before touching the input
    let pipeline = PipelineConfig::from(&config);
    pipeline.validate()?;
    validate_api_key(&config)?;

    let gateway = HttpGateway::new(GatewaySettings::from_config(&config)?)?;
    info!(
        endpoint = gateway.endpoint(),
        model = %pipeline.model_id,
        chunk_size = pipeline.chunk_size,
        concurrency = pipeline.concurrency_limit,
        "gateway ready"
    );

    let run_config = RunConfig {
        input_path: input.to_path_buf(),
        pipeline,
        output: config.output.clone(),
        sender: config.sender.clone(),
        resume,
    };

    // Ctrl-C stops the batch at the next safe point
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing the current chunk before stopping");
                cancel.cancel();
            }
        })
    };

    let reporter = CliProgress::new();
    let result = run_pipeline(&run_config, Arc::new(gateway), &reporter, &cancel).await;
    watcher.abort();
    let report = result?;

    let summary = &report.summary;
    println!();
    match summary.outcome {
        BatchOutcome::Completed => println!("  Run completed."),
        BatchOutcome::Cancelled => println!(
            "  Run cancelled. Resume with: outreach run {} --resume {}",
            input.display(),
            report.run_id
        ),
    }
    println!("  Run ID:          {}", report.run_id);
    println!("  Prospects:       {}", summary.results.len());
    println!("  Completed:       {}", summary.counts.completed);
    println!("  Partial failure: {}", summary.counts.partial_failure);
    println!("  Failure:         {}", summary.counts.failure);
    if summary.resumed > 0 {
        println!("  Resumed:         {}", summary.resumed);
    }
    println!(
        "  Chunks:          {}/{}",
        summary.chunks_processed, summary.chunks_total
    );
    println!("  Time:            {:.1}s", summary.elapsed.as_secs_f64());
    println!("  Files:");
    for artifact in &report.artifacts {
        println!("    {}", artifact.path.display());
    }
    println!();

    Ok(())
}

fn cmd_validate(input: &Path) -> Result<()> {
    let summary = validate_prospects_csv(input)?;

    println!("  Columns: {}", summary.columns.join(", "));
    println!("  Rows:    {}", summary.rows);
    println!("  Valid:   {}", summary.rows - summary.skipped.len());
    for row in &summary.skipped {
        println!("  Skipped line {}: {}", row.line, row.reason);
    }
    Ok(())
}

async fn cmd_runs(output_dir: Option<String>, limit: u32) -> Result<()> {
    let config = load_config()?;
    let dir = PathBuf::from(output_dir.unwrap_or(config.output.output_dir));
    let path = ledger_path(&dir);
    if !path.exists() {
        return Err(eyre!("no run ledger found at '{}'", path.display()));
    }

    let ledger = Ledger::open_readonly(&path).await?;
    let runs = ledger.list_runs(limit).await?;
    if runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }

    println!(
        "{:<38} {:<10} {:>6}  {:<20} INPUT",
        "RUN ID", "STATUS", "TOTAL", "STARTED"
    );
    for run in runs {
        println!(
            "{:<38} {:<10} {:>6}  {:<20} {}",
            run.id,
            run.status.as_str(),
            run.total,
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.input_path
        );
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=> ")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn started(&self, total: usize, already_done: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(already_done as u64);
    }

    fn chunk_started(&self, index: usize, chunks_total: usize, size: usize) {
        self.bar.set_message(format!(
            "chunk {}/{chunks_total} ({size} prospects)",
            index + 1
        ));
    }

    fn prospect_finished(&self, result: &ProcessingResult) {
        self.bar.inc(1);
        if result.status != ProcessingStatus::Completed {
            self.bar.println(format!(
                "  {} {}: {}",
                result.status,
                result.prospect.display_name(),
                result.error_detail.as_deref().unwrap_or("no detail")
            ));
        }
    }

    fn done(&self, _summary: &BatchSummary) {
        self.bar.finish_and_clear();
    }
}
