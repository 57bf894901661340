#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::redundant_closure_for_method_calls)]

//! mcp-letscloud library: the MCP server's building blocks, exposed for
//! downstream crates (e.g. letscloud-gateway).
//!
//! - `catalog`: tool definitions and JSON Schema generation
//! - `client`: LetsCloud HTTP API client
//! - `config`: configuration loading
//! - `context`: context validation, storage, and processing
//! - `dispatch`: tool dispatch over the shared upstream client
//! - `rpc`: MCP JSON-RPC protocol handling and the stdio transport

pub mod catalog;
pub mod client;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod rpc;

// Re-export key types at crate root for convenience.
pub use catalog::{ParamKind, ToolCatalog};
pub use client::{ClientError, LetsCloudClient};
pub use config::UpstreamConfig;
pub use context::{ContextAction, ContextHub, ContextKind, ContextState};
pub use dispatch::{DispatchError, Dispatcher, ErrorKind};
