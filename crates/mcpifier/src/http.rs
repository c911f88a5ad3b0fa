//! JSON-RPC over HTTP POST, plus the OAuth protected-resource metadata endpoint.

use crate::dispatcher::JsonRpcDispatcher;
use crate::error::{McpifierError, Result};
use crate::handlers::RequestContext;
use crate::jsonrpc::{JsonRpcResponse, decode_request_slice};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{OriginalUri, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, HOST, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse as _, Response};
use axum::routing::{get, post};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const PROTECTED_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";

/// HTTP-only settings derived from the configuration.
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    pub require_authorization: bool,
    pub resource_metadata: Option<Value>,
    /// Inbound headers copied onto outbound REST requests.
    pub forwarded_headers: Vec<HeaderName>,
}

#[derive(Clone)]
struct HttpState {
    dispatcher: Arc<JsonRpcDispatcher>,
    options: Arc<HttpOptions>,
    shutdown: CancellationToken,
}

/// Build the router: `POST <route>` for JSON-RPC, `GET /health`, and the metadata document.
///
/// # Errors
///
/// Returns an error if `route` is not a plain absolute path or collides with a built-in route.
pub fn router(
    dispatcher: Arc<JsonRpcDispatcher>,
    options: HttpOptions,
    route: &str,
    shutdown: CancellationToken,
) -> Result<Router> {
    validate_route(route)?;
    let state = HttpState {
        dispatcher,
        options: Arc::new(options),
        shutdown,
    };
    Ok(Router::new()
        .route(route, post(handle_rpc))
        .route("/health", get(|| async { "ok" }))
        .route(PROTECTED_RESOURCE_PATH, get(protected_resource_metadata))
        .route(
            &format!("{PROTECTED_RESOURCE_PATH}/"),
            get(protected_resource_metadata),
        )
        .route(
            &format!("{PROTECTED_RESOURCE_PATH}/{{*resource}}"),
            get(protected_resource_metadata),
        )
        .with_state(state))
}

fn validate_route(route: &str) -> Result<()> {
    if !route.starts_with('/') || route.contains(['{', '}', '?', '#']) {
        return Err(McpifierError::Config(format!(
            "HTTP route '{route}' must be an absolute path without placeholders"
        )));
    }
    if route == "/health" || route.starts_with(PROTECTED_RESOURCE_PATH) {
        return Err(McpifierError::Config(format!(
            "HTTP route '{route}' collides with a built-in endpoint"
        )));
    }
    Ok(())
}

/// Serve `router` on `listener` until `shutdown` fires.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve_http(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Serving MCP over HTTP on http://{addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| McpifierError::Startup(format!("HTTP server failed: {e}")))?;
    info!("HTTP transport stopped");
    Ok(())
}

async fn handle_rpc(
    State(state): State<HttpState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if state.options.require_authorization && !headers.contains_key(AUTHORIZATION) {
        debug!("rejecting request without Authorization header");
        return unauthorized(&headers, &uri);
    }

    let request = match decode_request_slice(&body) {
        Ok(request) => request,
        Err(response) => return json_response(&response),
    };

    // Dropping this future (client went away) cancels the outbound REST call.
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    let ctx = RequestContext::new(
        forwarded_headers(&headers, &state.options.forwarded_headers),
        cancel,
    );

    let response = state.dispatcher.dispatch(&request, &ctx).await;
    json_response(&response)
}

fn forwarded_headers(inbound: &HeaderMap, names: &[HeaderName]) -> HeaderMap {
    let mut out = HeaderMap::new();
    for name in names {
        for value in inbound.get_all(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

fn json_response(response: &JsonRpcResponse) -> Response {
    let Some(wire) = response.to_wire() else {
        return StatusCode::NO_CONTENT.into_response();
    };
    match serde_json::to_vec(&wire) {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("failed to serialize response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn unauthorized(headers: &HeaderMap, uri: &Uri) -> Response {
    let challenge = format!(
        "Bearer resource_metadata=\"{}\"",
        resource_metadata_url(headers, uri)
    );
    match HeaderValue::from_str(&challenge) {
        Ok(value) => (StatusCode::UNAUTHORIZED, [(WWW_AUTHENTICATE, value)]).into_response(),
        Err(_) => StatusCode::UNAUTHORIZED.into_response(),
    }
}

/// `<scheme>://<authority>/.well-known/oauth-protected-resource<path>` for the inbound request.
fn resource_metadata_url(headers: &HeaderMap, uri: &Uri) -> String {
    let scheme = uri
        .scheme_str()
        .or_else(|| {
            headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
        })
        .unwrap_or("http");
    let authority = uri
        .authority()
        .map(|a| a.as_str().to_string())
        .or_else(|| {
            headers
                .get(HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_default();
    format!("{scheme}://{authority}{PROTECTED_RESOURCE_PATH}{}", uri.path())
}

async fn protected_resource_metadata(State(state): State<HttpState>) -> Response {
    let Some(metadata) = &state.options.resource_metadata else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match serde_json::to_vec(metadata) {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("failed to serialize resource metadata: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_url_uses_host_header_and_path() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("mcp.example.com:8080"));
        let uri: Uri = "/mcp".parse().expect("uri");
        assert_eq!(
            resource_metadata_url(&headers, &uri),
            "http://mcp.example.com:8080/.well-known/oauth-protected-resource/mcp"
        );
    }

    #[test]
    fn metadata_url_honours_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("mcp.example.com"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        let uri: Uri = "/".parse().expect("uri");
        assert_eq!(
            resource_metadata_url(&headers, &uri),
            "https://mcp.example.com/.well-known/oauth-protected-resource/"
        );
    }

    #[test]
    fn only_configured_headers_are_forwarded() {
        let mut inbound = HeaderMap::new();
        inbound.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        inbound.insert("x-trace", HeaderValue::from_static("1"));
        inbound.append("x-trace", HeaderValue::from_static("2"));
        inbound.insert("cookie", HeaderValue::from_static("secret"));

        let names = [AUTHORIZATION, HeaderName::from_static("x-trace")];
        let out = forwarded_headers(&inbound, &names);

        assert_eq!(out.len(), 3);
        assert_eq!(out[AUTHORIZATION], "Bearer t");
        assert_eq!(out.get_all("x-trace").iter().count(), 2);
        assert!(!out.contains_key("cookie"));
    }

    #[test]
    fn routes_are_validated() {
        for ok in ["/", "/mcp", "/api/v1/mcp"] {
            assert!(validate_route(ok).is_ok(), "{ok}");
        }
        for bad in ["", "mcp", "/{x}", "/health", "/.well-known/oauth-protected-resource"] {
            assert!(validate_route(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn empty_response_is_no_content() {
        assert_eq!(
            json_response(&JsonRpcResponse::Empty).status(),
            StatusCode::NO_CONTENT
        );
    }
}
