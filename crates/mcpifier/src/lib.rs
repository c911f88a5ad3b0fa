//! mcpifier: expose REST APIs as MCP tools.
//!
//! A JSON-RPC 2.0 server that speaks the MCP tool methods (`initialize`, `ping`, `tools/list`,
//! `tools/call`) over newline-delimited stdio or HTTP POST. Every tool is a mapping onto one REST
//! call; see [`mcpifier_rest_tools`] for the mapping model and [`mcpifier_openapi_tools`] for
//! generating mappings from an `OpenAPI` document.

pub mod app;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod http;
pub mod jsonrpc;
pub mod stdio;

pub use app::App;
pub use config::McpifierConfig;
pub use dispatcher::{HandlerTable, JsonRpcDispatcher};
pub use error::{McpifierError, Result};
pub use handlers::{HandlerError, McpHandlers, McpMethod, RequestContext, RpcHandler};
pub use jsonrpc::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
