//! MCP method handlers.

use crate::config::{McpifierConfig, ServerInfo};
use crate::dispatcher::HandlerTable;
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use async_trait::async_trait;
use axum::http::HeaderMap;
use mcpifier_rest_tools::{
    McpToolDefinition, RestExecutor, RestOutcome, RestToolsError, ToolRegistry,
};
use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Protocol revisions echoed back when a client asks for one of them.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Per-request state handed to every handler.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Inbound headers selected for forwarding to the REST API.
    pub headers: HeaderMap,
    /// Fires when the caller goes away or the server shuts down.
    pub cancel: CancellationToken,
}

impl RequestContext {
    #[must_use]
    pub fn new(headers: HeaderMap, cancel: CancellationToken) -> Self {
        Self { headers, cancel }
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    InvalidParams(String),
    #[error("{0}")]
    Internal(String),
    /// The request was cancelled; no response is produced.
    #[error("request cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidParams(e.to_string())
    }
}

#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn handle(
        &self,
        request: &JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<JsonRpcResponse, HandlerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum McpMethod {
    Ping,
    Initialize,
    NotificationsInitialized,
    ToolsList,
    ToolsCall,
}

impl McpMethod {
    pub const ALL: [Self; 5] = [
        Self::Ping,
        Self::Initialize,
        Self::NotificationsInitialized,
        Self::ToolsList,
        Self::ToolsCall,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Initialize => "initialize",
            Self::NotificationsInitialized => "notifications/initialized",
            Self::ToolsList => "tools/list",
            Self::ToolsCall => "tools/call",
        }
    }

    /// Exact, case-sensitive match.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

pub struct PingHandler;

#[async_trait]
impl RpcHandler for PingHandler {
    async fn handle(
        &self,
        request: &JsonRpcRequest,
        _ctx: &RequestContext,
    ) -> Result<JsonRpcResponse, HandlerError> {
        Ok(JsonRpcResponse::success(request.response_id(), json!({})))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult<'a> {
    protocol_version: &'a str,
    capabilities: Value,
    server_info: &'a ServerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
}

pub struct InitializeHandler {
    protocol_version: String,
    server_info: ServerInfo,
    instructions: Option<String>,
}

impl InitializeHandler {
    #[must_use]
    pub fn new(config: &McpifierConfig) -> Self {
        Self {
            protocol_version: config.protocol_version.clone(),
            server_info: config.server_info.clone(),
            instructions: config.instructions.clone(),
        }
    }
}

#[async_trait]
impl RpcHandler for InitializeHandler {
    async fn handle(
        &self,
        request: &JsonRpcRequest,
        _ctx: &RequestContext,
    ) -> Result<JsonRpcResponse, HandlerError> {
        let requested = request
            .params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v));
        if let Some(client) = request.params.as_ref().and_then(|p| p.get("clientInfo")) {
            debug!(client = %client, "initialize");
        }

        let result = InitializeResult {
            protocol_version: requested.unwrap_or(&self.protocol_version),
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: &self.server_info,
            instructions: self.instructions.as_deref(),
        };
        let result = serde_json::to_value(result)
            .map_err(|e| HandlerError::Internal(format!("serialize initialize result: {e}")))?;
        Ok(JsonRpcResponse::success(request.response_id(), result))
    }
}

pub struct InitializedNotificationHandler;

#[async_trait]
impl RpcHandler for InitializedNotificationHandler {
    async fn handle(
        &self,
        request: &JsonRpcRequest,
        _ctx: &RequestContext,
    ) -> Result<JsonRpcResponse, HandlerError> {
        debug!("client initialized");
        if request.is_notification() {
            return Ok(JsonRpcResponse::Empty);
        }
        Ok(JsonRpcResponse::success(request.response_id(), json!({})))
    }
}

#[derive(Serialize)]
struct ToolsListResult<'a> {
    tools: Vec<&'a McpToolDefinition>,
}

pub struct ToolsListHandler {
    registry: Arc<ToolRegistry>,
}

impl ToolsListHandler {
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl RpcHandler for ToolsListHandler {
    async fn handle(
        &self,
        request: &JsonRpcRequest,
        _ctx: &RequestContext,
    ) -> Result<JsonRpcResponse, HandlerError> {
        // Pagination cursors are accepted and ignored; every tool fits in one page.
        match &request.params {
            None | Some(Value::Null | Value::Object(_)) => {}
            Some(other) => {
                return Err(HandlerError::InvalidParams(format!(
                    "tools/list params must be an object, got {other}"
                )));
            }
        }
        let result = ToolsListResult {
            tools: self.registry.iter().map(|t| &t.mcp).collect(),
        };
        let result = serde_json::to_value(result)
            .map_err(|e| HandlerError::Internal(format!("serialize tools: {e}")))?;
        Ok(JsonRpcResponse::success(request.response_id(), result))
    }
}

#[derive(Debug, Deserialize)]
struct ToolsCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

pub struct ToolsCallHandler {
    registry: Arc<ToolRegistry>,
    executor: Option<RestExecutor>,
}

impl ToolsCallHandler {
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, executor: Option<RestExecutor>) -> Self {
        Self { registry, executor }
    }
}

#[async_trait]
impl RpcHandler for ToolsCallHandler {
    async fn handle(
        &self,
        request: &JsonRpcRequest,
        ctx: &RequestContext,
    ) -> Result<JsonRpcResponse, HandlerError> {
        let params: ToolsCallParams =
            serde_json::from_value(request.params.clone().unwrap_or(Value::Null))?;
        let arguments = params.arguments.unwrap_or_default();

        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| HandlerError::InvalidParams(format!("Tool '{}' not found", params.name)))?;

        tool.mcp
            .input_schema
            .validate(&Value::Object(arguments.clone()))
            .map_err(|e| match e {
                RestToolsError::Validation(msg) => HandlerError::InvalidParams(msg),
                other => HandlerError::Internal(format!(
                    "Tool '{}' has an unusable input schema: {other}",
                    params.name
                )),
            })?;

        let executor = self.executor.as_ref().ok_or_else(|| {
            HandlerError::Internal("No REST base address is configured".to_string())
        })?;

        let outcome = executor
            .execute(tool, &arguments, &ctx.headers, &ctx.cancel)
            .await
            .ok_or(HandlerError::Cancelled)?;
        if !outcome.success {
            warn!(tool = %params.name, status = outcome.status, "REST call failed");
        }

        let result = serde_json::to_value(call_tool_result(outcome))
            .map_err(|e| HandlerError::Internal(format!("serialize tool result: {e}")))?;
        Ok(JsonRpcResponse::success(request.response_id(), result))
    }
}

fn call_tool_result(outcome: RestOutcome) -> CallToolResult {
    if !outcome.success {
        return CallToolResult {
            content: vec![Content::text(format!(
                "REST API returned error code {}: '{}'",
                outcome.status, outcome.body
            ))],
            structured_content: None,
            is_error: Some(true),
            meta: None,
        };
    }

    let structured = serde_json::from_str::<Value>(&outcome.body)
        .ok()
        .filter(|v| v.is_object() || v.is_array());
    CallToolResult {
        content: vec![Content::text(outcome.body)],
        structured_content: structured,
        is_error: Some(false),
        meta: None,
    }
}

/// The handler for every supported MCP method, resolved by exact name.
pub struct McpHandlers {
    ping: PingHandler,
    initialize: InitializeHandler,
    initialized: InitializedNotificationHandler,
    tools_list: ToolsListHandler,
    tools_call: ToolsCallHandler,
}

impl McpHandlers {
    #[must_use]
    pub fn new(
        config: &McpifierConfig,
        registry: Arc<ToolRegistry>,
        executor: Option<RestExecutor>,
    ) -> Self {
        Self {
            ping: PingHandler,
            initialize: InitializeHandler::new(config),
            initialized: InitializedNotificationHandler,
            tools_list: ToolsListHandler::new(Arc::clone(&registry)),
            tools_call: ToolsCallHandler::new(registry, executor),
        }
    }
}

impl HandlerTable for McpHandlers {
    fn resolve(&self, method: &str) -> Option<&dyn RpcHandler> {
        Some(match McpMethod::from_name(method)? {
            McpMethod::Ping => &self.ping,
            McpMethod::Initialize => &self.initialize,
            McpMethod::NotificationsInitialized => &self.initialized,
            McpMethod::ToolsList => &self.tools_list,
            McpMethod::ToolsCall => &self.tools_call,
        })
    }
}
