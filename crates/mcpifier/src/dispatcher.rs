//! Routes decoded JSON-RPC requests to handlers and turns handler failures into error responses.

use crate::handlers::{HandlerError, McpHandlers, RequestContext, RpcHandler};
use crate::jsonrpc::{ErrorCode, JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse};
use futures::FutureExt as _;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, warn};

/// Method-name lookup for the dispatcher.
pub trait HandlerTable: Send + Sync {
    fn resolve(&self, method: &str) -> Option<&dyn RpcHandler>;
}

pub struct JsonRpcDispatcher<T = McpHandlers> {
    handlers: T,
}

impl<T: HandlerTable> JsonRpcDispatcher<T> {
    #[must_use]
    pub fn new(handlers: T) -> Self {
        Self { handlers }
    }

    /// Dispatch one request.
    ///
    /// Never fails: every fault becomes an error response. Requests without an `id` never get a
    /// response, whatever happened while handling them.
    pub async fn dispatch(&self, request: &JsonRpcRequest, ctx: &RequestContext) -> JsonRpcResponse {
        let response = self.dispatch_inner(request, ctx).await;
        if request.is_notification() {
            if let JsonRpcResponse::Error { error, .. } = &response {
                debug!(method = %request.method, code = error.code, "dropping error for notification");
            }
            return JsonRpcResponse::Empty;
        }
        response
    }

    async fn dispatch_inner(&self, request: &JsonRpcRequest, ctx: &RequestContext) -> JsonRpcResponse {
        let id = request.response_id();

        if request.jsonrpc != JSONRPC_VERSION {
            return JsonRpcResponse::error(
                id,
                ErrorCode::InvalidRequest,
                Some(Value::String(format!(
                    "Unsupported JSON-RPC version '{}'",
                    request.jsonrpc
                ))),
            );
        }

        let Some(handler) = self.handlers.resolve(&request.method) else {
            debug!(method = %request.method, "method not found");
            return JsonRpcResponse::error(
                id,
                ErrorCode::MethodNotFound,
                Some(Value::String(request.method.clone())),
            );
        };

        match AssertUnwindSafe(handler.handle(request, ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(HandlerError::InvalidParams(message))) => {
                debug!(method = %request.method, "invalid params: {message}");
                JsonRpcResponse::error(id, ErrorCode::InvalidParams, Some(Value::String(message)))
            }
            Ok(Err(HandlerError::Internal(message))) => {
                error!(method = %request.method, "handler failed: {message}");
                JsonRpcResponse::error(id, ErrorCode::InternalError, Some(Value::String(message)))
            }
            Ok(Err(HandlerError::Cancelled)) => {
                debug!(method = %request.method, "request cancelled");
                JsonRpcResponse::Empty
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(method = %request.method, "handler panicked: {message}");
                JsonRpcResponse::error(id, ErrorCode::InternalError, Some(Value::String(message)))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}
