//! # mcp-letscloud
//!
//! MCP (Model Context Protocol) server that exposes LetsCloud infrastructure
//! management as tools. Runs as a stdio JSON-RPC server, designed to be
//! launched by an AI agent host.
//!
//! ## Architecture
//!
//! ```text
//! main.rs     - entry point, config loading, MCP server launch
//! config.rs   - JSON file / env-var configuration loading
//! client.rs   - HTTP client for the LetsCloud REST API
//! catalog.rs  - tool definitions and JSON Schema generation
//! dispatch.rs - argument validation and tool dispatch
//! context.rs  - context validation rules and keyed context store
//! rpc.rs      - MCP JSON-RPC protocol handler (stdio)
//! ```
//!
//! ## Tools
//!
//! - **Servers**: `list_servers`, `get_server`, `create_server`,
//!   `delete_server`, `reboot_server`, `shutdown_server`, `start_server`
//! - **SSH keys**: `list_ssh_keys`, `get_ssh_key`, `create_ssh_key`,
//!   `delete_ssh_key`
//! - **Snapshots**: `create_snapshot`, `get_snapshot`, `list_snapshots`,
//!   `delete_snapshot`, `restore_snapshot`
//! - **Catalog / account**: `list_plans`, `list_images`, `list_locations`,
//!   `get_account_info`
//!
//! All protocol traffic stays on stdout; diagnostics go to stderr so the
//! JSON-RPC stream is never polluted.

use clap::Parser;

use mcp_letscloud::config::{self, Cli};
use mcp_letscloud::dispatch::Dispatcher;
use mcp_letscloud::rpc;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let resolved = match config::load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mcp-letscloud: configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // A missing token is not fatal: the catalog still serves tools/list, and
    // each tools/call reports a configuration error until a token appears.
    if resolved.api_token.is_empty() {
        eprintln!("mcp-letscloud: warning: LETSCLOUD_API_TOKEN is not set; tool calls will fail");
    }

    let base_url = resolved.base_url.clone();
    let dispatcher = Dispatcher::new(resolved);
    eprintln!(
        "mcp-letscloud: {} tool(s) available, api={}",
        dispatcher.catalog().len(),
        base_url
    );

    rpc::run_stdio(&dispatcher).await;
}
