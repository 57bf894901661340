//! Configuration loading for mcp-letscloud.
//!
//! Configuration is resolved from three sources (later ones win):
//!
//! 1. **Compiled defaults**: public API base URL, 30 s timeout.
//! 2. **JSON file** via `--config <path>` CLI flag or the
//!    `LETSCLOUD_MCP_CONFIG` environment variable.
//! 3. **Environment variables**: `LETSCLOUD_API_TOKEN`,
//!    `LETSCLOUD_API_URL`.
//!
//! A missing API token is not a startup error: the process comes up, logs a
//! warning, and every invocation fails with a configuration error until a
//! token is supplied. This keeps `tools/list` and protocol handshakes
//! working on an unconfigured install.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

/// CLI arguments parsed by `clap`.
#[derive(Parser)]
#[command(name = "mcp-letscloud", about = "MCP server for LetsCloud infrastructure")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Upstream API settings shared by both binaries.
///
/// `max_retries` and `rate_limit` are declared for config compatibility but
/// are **not currently enforced**: requests are made exactly once and never
/// throttled here.
#[derive(Clone, Debug, Deserialize)]
pub struct UpstreamConfig {
    /// LetsCloud API token. May be empty; invocations then fail with a
    /// configuration error instead of reaching the network.
    #[serde(default)]
    pub api_token: String,
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Total per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// **Not currently enforced.**
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Requests per minute. **Not currently enforced.**
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
}

fn default_base_url() -> String {
    "https://core.letscloud.io/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_rate_limit() -> u32 {
    100
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            rate_limit: default_rate_limit(),
        }
    }
}

/// Load configuration from CLI args, config file, and environment.
pub fn load_config(cli: &Cli) -> Result<UpstreamConfig, String> {
    let mut config = if let Some(path) = &cli.config {
        load_from_file(&expand_tilde(path))?
    } else if let Ok(path) = std::env::var("LETSCLOUD_MCP_CONFIG") {
        load_from_file(&expand_tilde(&PathBuf::from(path)))?
    } else {
        UpstreamConfig::default()
    };

    apply_env_overrides(
        &mut config,
        std::env::var("LETSCLOUD_API_TOKEN").ok(),
        std::env::var("LETSCLOUD_API_URL").ok(),
    );

    if config.base_url.trim().is_empty() {
        return Err("base_url is empty".into());
    }
    Ok(config)
}

/// Apply environment overrides on top of file/default values.
fn apply_env_overrides(
    config: &mut UpstreamConfig,
    api_token: Option<String>,
    base_url: Option<String>,
) {
    if let Some(token) = api_token {
        if !token.is_empty() {
            config.api_token = token;
        }
    }
    if let Some(url) = base_url {
        if !url.is_empty() {
            config.base_url = url;
        }
    }
}

/// Expand a leading `~` to `$HOME`.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

fn load_from_file(path: &Path) -> Result<UpstreamConfig, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
    parse_config(&contents).map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))
}

fn parse_config(contents: &str) -> Result<UpstreamConfig, String> {
    serde_json::from_str(contents).map_err(|e| e.to_string())
}
