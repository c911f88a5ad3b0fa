//! REST execution engine: one tool call in, one outbound HTTP request out.

use crate::error::{RestToolsError, Result};
use crate::mapping::ToolMapping;
use crate::template::{interpolate_body, interpolate_path, interpolate_query};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

/// Normalized result of a REST call.
///
/// Non-2xx responses and transport faults are data, not errors: `success` is `false` and `body`
/// carries whatever the server (or the transport) produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestOutcome {
    pub success: bool,
    pub status: u16,
    pub body: String,
}

impl RestOutcome {
    fn transport_failure(message: String) -> Self {
        Self {
            success: false,
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            body: message,
        }
    }
}

#[derive(Clone)]
pub struct RestExecutor {
    inner: Arc<RestExecutorInner>,
}

struct RestExecutorInner {
    client: Client,
    base_url: Url,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl RestExecutor {
    /// Build an executor for a base address.
    ///
    /// The base address is normalized to end with `/` so that tool paths append to it rather than
    /// replacing its last segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the base address is not an absolute http(s) URL or the HTTP client
    /// cannot be built.
    pub fn new(
        base_address: &str,
        default_headers: HeaderMap,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| RestToolsError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(
            client,
            normalize_base_address(base_address)?,
            default_headers,
            timeout,
        ))
    }

    #[must_use]
    pub fn with_client(
        client: Client,
        base_url: Url,
        default_headers: HeaderMap,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(RestExecutorInner {
                client,
                base_url,
                default_headers,
                timeout,
            }),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Execute `tool` with `arguments`.
    ///
    /// `forwarded` headers are attached as-is on top of the configured default headers (a
    /// forwarded header replaces a default one of the same name).
    ///
    /// Returns `None` only when `cancel` fires before the response is complete; the in-flight
    /// request is dropped in that case.
    pub async fn execute(
        &self,
        tool: &ToolMapping,
        arguments: &Map<String, Value>,
        forwarded: &HeaderMap,
        cancel: &CancellationToken,
    ) -> Option<RestOutcome> {
        let name = tool.name();
        let relative = resolve_relative_path(tool, arguments);

        info!("Executing tool {name}: {} {relative}", tool.rest.method);

        let url = match self.inner.base_url.join(&relative) {
            Ok(u) => u,
            Err(e) => {
                error!(tool = %name, "invalid request URL '{relative}': {e}");
                return Some(RestOutcome::transport_failure(format!(
                    "HTTP request failed: invalid request URL '{relative}': {e}"
                )));
            }
        };

        let method = match Method::from_bytes(tool.rest.method.trim().to_uppercase().as_bytes()) {
            Ok(m) => m,
            Err(_) => {
                error!(tool = %name, "invalid HTTP method '{}'", tool.rest.method);
                return Some(RestOutcome::transport_failure(format!(
                    "HTTP request failed: invalid HTTP method '{}'",
                    tool.rest.method
                )));
            }
        };

        let mut headers = self.inner.default_headers.clone();
        for header_name in forwarded.keys() {
            debug!(tool = %name, header = %header_name, "Forwarding header");
        }
        headers.extend(forwarded.clone());

        let mut request = self.inner.client.request(method, url).headers(headers);
        if let Some(body) = &tool.rest.body {
            request = request
                .header(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/json; charset=utf-8"),
                )
                .body(interpolate_body(body, arguments));
        }
        if let Some(t) = self.inner.timeout {
            request = request.timeout(t);
        }

        let send = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        tokio::select! {
            () = cancel.cancelled() => {
                debug!(tool = %name, "REST call cancelled");
                None
            }
            result = send => Some(match result {
                Ok((status, body)) => {
                    info!("REST API response: {} for tool {name}", status.as_u16());
                    RestOutcome {
                        success: status.is_success(),
                        status: status.as_u16(),
                        body,
                    }
                }
                Err(e) => {
                    let message = sanitize_reqwest_error(&e);
                    error!(tool = %name, "HTTP request failed: {message}");
                    RestOutcome::transport_failure(format!("HTTP request failed: {message}"))
                }
            }),
        }
    }
}

/// Parse and normalize a configured base address.
///
/// # Errors
///
/// Returns an error if the address is not an absolute http(s) URL.
pub fn normalize_base_address(base_address: &str) -> Result<Url> {
    let mut url = Url::parse(base_address.trim()).map_err(|e| {
        RestToolsError::Config(format!("Invalid REST base address '{base_address}': {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RestToolsError::Config(format!(
            "REST base address '{base_address}' must use http or https"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Interpolated `path[?query]` with any leading `/` removed, ready to join onto the base URL.
fn resolve_relative_path(tool: &ToolMapping, arguments: &Map<String, Value>) -> String {
    let mut path = interpolate_path(&tool.rest.path, arguments);
    if let Some(query) = &tool.rest.query {
        let query = interpolate_query(query, arguments);
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query);
        }
    }
    let relative = match path.strip_prefix('/') {
        Some(rest) => rest.to_string(),
        None => path,
    };
    // `users:search` alone would parse as a URL with scheme `users`.
    let first_segment = relative.split(['/', '?']).next().unwrap_or_default();
    if first_segment.contains(':') {
        format!("./{relative}")
    } else {
        relative
    }
}

fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

/// Error text with credentials, query and fragment stripped from the request URL.
fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}
