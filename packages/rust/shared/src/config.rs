//! Application configuration for Outreach.
//!
//! User config lives at `~/.outreach/outreach.toml`.
//! CLI flags (and their environment fallbacks) override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OutreachError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "outreach.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".outreach";

// ---------------------------------------------------------------------------
// Config structs (matching outreach.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model gateway connection.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Batch processing knobs.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Output artifact locations.
    #[serde(default)]
    pub output: OutputConfig,

    /// Who the outreach is sent on behalf of.
    #[serde(default)]
    pub sender: SenderProfile,
}

/// `[gateway]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// OpenAI-compatible gateway root (without `/chat/completions`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Per-call timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ask the gateway to log requests on its side.
    #[serde(default)]
    pub enable_request_logging: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            model_id: default_model_id(),
            timeout_secs: default_timeout_secs(),
            enable_request_logging: false,
        }
    }
}

fn default_base_url() -> String {
    "https://llm-gateway.truefoundry.com".into()
}
fn default_api_key_env() -> String {
    "TFY_API_KEY".into()
}
fn default_model_id() -> String {
    "openai-main/gpt-5".into()
}
fn default_timeout_secs() -> u64 {
    300
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Retries after the first attempt of each gateway call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Prospects in flight at once within a chunk.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// First retry delay; doubles on each further retry.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on a single retry delay.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_retries: default_max_retries(),
            concurrency_limit: default_concurrency_limit(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

fn default_chunk_size() -> usize {
    5
}
fn default_max_retries() -> u32 {
    3
}
fn default_concurrency_limit() -> usize {
    2
}
fn default_backoff_base_ms() -> u64 {
    1_000
}
fn default_backoff_max_ms() -> u64 {
    30_000
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for reports and the run ledger.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_research_prefix")]
    pub research_prefix: String,

    #[serde(default = "default_email_prefix")]
    pub email_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            research_prefix: default_research_prefix(),
            email_prefix: default_email_prefix(),
        }
    }
}

fn default_output_dir() -> String {
    "output".into()
}
fn default_research_prefix() -> String {
    "research_output".into()
}
fn default_email_prefix() -> String {
    "email_output".into()
}

/// `[sender]` section. Fed into the research and email prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderProfile {
    #[serde(default = "default_sender_company")]
    pub company: String,

    /// One-paragraph pitch the email builds on.
    #[serde(default = "default_value_proposition")]
    pub value_proposition: String,

    /// Customers the email may name as social proof.
    #[serde(default = "default_reference_customers")]
    pub reference_customers: Vec<String>,
}

impl Default for SenderProfile {
    fn default() -> Self {
        Self {
            company: default_sender_company(),
            value_proposition: default_value_proposition(),
            reference_customers: default_reference_customers(),
        }
    }
}

fn default_sender_company() -> String {
    "TrueFoundry".into()
}
fn default_value_proposition() -> String {
    "an enterprise AI platform that lets teams deploy, govern and scale LLMs, agents and \
     ML models on their own cloud or on-prem infrastructure, with an AI gateway for \
     cost tracking, guardrails and observability"
        .into()
}
fn default_reference_customers() -> Vec<String> {
    ["Mastercard", "CVS", "Merck", "NVIDIA", "Comcast", "Synopsys"]
        .into_iter()
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime batch configuration, merged from config file + CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub model_id: String,
    pub chunk_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub concurrency_limit: usize,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl PipelineConfig {
    /// Reject settings that would make a run meaningless or hang.
    pub fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(OutreachError::config("model id must not be empty"));
        }
        if self.chunk_size == 0 {
            return Err(OutreachError::config("chunk size must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(OutreachError::config("timeout must be at least 1 second"));
        }
        if self.concurrency_limit == 0 {
            return Err(OutreachError::config("concurrency limit must be at least 1"));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(OutreachError::config(format!(
                "backoff max ({}ms) is below backoff base ({}ms)",
                self.backoff_max_ms, self.backoff_base_ms
            )));
        }
        Ok(())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model_id: config.gateway.model_id.clone(),
            chunk_size: config.pipeline.chunk_size,
            max_retries: config.pipeline.max_retries,
            timeout_secs: config.gateway.timeout_secs,
            concurrency_limit: config.pipeline.concurrency_limit,
            backoff_base_ms: config.pipeline.backoff_base_ms,
            backoff_max_ms: config.pipeline.backoff_max_ms,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.outreach/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OutreachError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.outreach/outreach.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| OutreachError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| OutreachError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OutreachError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OutreachError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OutreachError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the gateway API key from the configured env var.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.gateway.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(OutreachError::config(format!(
            "gateway API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that the gateway API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    resolve_api_key(config).map(|_| ())
}
