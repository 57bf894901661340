//! Configuration loading and defaults.
//!
//! Configuration is resolved in order of precedence (highest wins):
//!
//! 1. **Environment variables**: `GATEWAY_API_KEY`, `GATEWAY_LISTEN`,
//!    `LETSCLOUD_API_TOKEN`, `LETSCLOUD_API_URL`
//! 2. **Config file**: path via `--config <path>`, or `gateway.toml` in CWD
//! 3. **Compiled defaults**: see each field's default value below
//!
//! The TOML file mirrors the struct hierarchy:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//!
//! [auth]
//! api_key = "your-secret-key"
//!
//! [upstream]
//! api_token = "your-letscloud-token"
//! base_url = "https://core.letscloud.io/api"
//! timeout_secs = 30
//!
//! [context]
//! allowed_actions = ["create", "read", "update", "delete"]
//!
//! [logging]
//! level = "info"
//! ```

use std::path::Path;

use serde::Deserialize;

use mcp_letscloud::config::UpstreamConfig;
use mcp_letscloud::context::ContextAction;

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Upstream LetsCloud API settings, shared with the stdio MCP binary.
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (default `0.0.0.0:8080`).
    #[serde(default = "default_listen")]
    pub listen: String,
}

/// Authentication settings for inbound requests.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Pre-shared Bearer token. Override with `GATEWAY_API_KEY` env var.
    /// Defaults to `"change-me"` which triggers a startup warning.
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

/// Context subsystem settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Actions accepted by the infrastructure context rule (default all four).
    /// Unknown action names are ignored.
    #[serde(default = "default_allowed_actions")]
    pub allowed_actions: Vec<String>,
}

impl ContextConfig {
    /// The configured actions as typed values, unknown names dropped.
    pub fn actions(&self) -> Vec<ContextAction> {
        self.allowed_actions
            .iter()
            .filter_map(|name| ContextAction::from_name(name))
            .collect()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter level (default `info`). Overridden by `RUST_LOG` env var.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_api_key() -> String {
    "change-me".to_string()
}
fn default_allowed_actions() -> Vec<String> {
    vec![
        "create".to_string(),
        "read".to_string(),
        "update".to_string(),
        "delete".to_string(),
    ]
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            allowed_actions: default_allowed_actions(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with the precedence chain: env vars > file > defaults.
    ///
    /// If `path` is `Some`, reads that file (panics on failure). Otherwise looks
    /// for `gateway.toml` in the current directory, falling back to compiled
    /// defaults.
    pub fn load(path: Option<&str>) -> Self {
        let mut config = if let Some(p) = path {
            let content = std::fs::read_to_string(p)
                .unwrap_or_else(|e| panic!("Failed to read config file {p}: {e}"));
            toml::from_str(&content)
                .unwrap_or_else(|e| panic!("Failed to parse config file {p}: {e}"))
        } else if Path::new("gateway.toml").exists() {
            let content =
                std::fs::read_to_string("gateway.toml").expect("Failed to read gateway.toml");
            toml::from_str(&content).expect("Failed to parse gateway.toml")
        } else {
            Config {
                server: ServerConfig::default(),
                auth: AuthConfig::default(),
                upstream: UpstreamConfig::default(),
                context: ContextConfig::default(),
                logging: LoggingConfig::default(),
            }
        };

        // Env var overrides
        if let Ok(key) = std::env::var("GATEWAY_API_KEY") {
            config.auth.api_key = key;
        }
        if let Ok(listen) = std::env::var("GATEWAY_LISTEN") {
            config.server.listen = listen;
        }
        if let Ok(token) = std::env::var("LETSCLOUD_API_TOKEN") {
            config.upstream.api_token = token;
        }
        if let Ok(url) = std::env::var("LETSCLOUD_API_URL") {
            if !url.is_empty() {
                config.upstream.base_url = url;
            }
        }

        config
    }
}
