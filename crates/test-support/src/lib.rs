//! Helpers shared by the integration tests: child-process cleanup, ports, readiness polling and a
//! small REST API to point tools at.

use anyhow::Context as _;
use axum::Json;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse as _, Response};
use axum::routing::any;
use serde_json::{Value, json};
use std::net::TcpListener;
use std::process::Child;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Pick an unused TCP port on localhost.
///
/// Note: this does not reserve the port; it's still possible for another process to bind it
/// before you do.
///
/// # Errors
///
/// Returns an error if binding an ephemeral localhost port fails or if the bound socket's
/// local address cannot be read.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// Poll an HTTP URL until it returns a success status (2xx/3xx).
///
/// # Errors
///
/// Returns an error if the timeout elapses before the endpoint returns a success status.
pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout_dur {
            anyhow::bail!("timed out waiting for {url}");
        }

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            _ => tokio::time::sleep(Duration::from_millis(200)).await,
        }
    }
}

/// An in-process REST API for tools to call.
///
/// - `GET /api/test` answers `{"status":"ok"}`
/// - `/api/echo/...` answers with the method, path, query, selected headers and body it received
/// - `/api/slow` answers only after [`SLOW_RESPONSE_DELAY`]; see [`MockRestApi::slow_abandoned`]
/// - anything else is `404 {"error":"not found"}`
///
/// Stops when dropped.
pub struct MockRestApi {
    pub base_url: String,
    slow: Arc<SlowCounters>,
    shutdown: Option<oneshot::Sender<()>>,
}

pub const SLOW_RESPONSE_DELAY: Duration = Duration::from_secs(30);

#[derive(Default)]
struct SlowCounters {
    started: AtomicUsize,
    abandoned: AtomicUsize,
}

/// Counts a slow request as abandoned if its handler is dropped before finishing.
struct AbandonGuard {
    counters: Arc<SlowCounters>,
    finished: bool,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.counters.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl MockRestApi {
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind mock REST API")?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();
        let slow = Arc::new(SlowCounters::default());

        let app = Router::new()
            .route("/api/slow", any(slow_handler))
            .route("/{*path}", any(mock_handler))
            .with_state(slow.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            slow,
            shutdown: Some(tx),
        })
    }

    /// Requests that reached `/api/slow`.
    #[must_use]
    pub fn slow_started(&self) -> usize {
        self.slow.started.load(Ordering::SeqCst)
    }

    /// `/api/slow` requests whose handler was dropped before answering, i.e. the caller hung up.
    #[must_use]
    pub fn slow_abandoned(&self) -> usize {
        self.slow.abandoned.load(Ordering::SeqCst)
    }

    /// Poll `check` until it holds or `timeout_dur` elapses.
    ///
    /// # Errors
    ///
    /// Returns an error naming `what` on timeout.
    pub async fn wait_until(
        &self,
        what: &str,
        timeout_dur: Duration,
        check: impl Fn(&Self) -> bool,
    ) -> anyhow::Result<()> {
        let start = Instant::now();
        while !check(self) {
            if start.elapsed() > timeout_dur {
                anyhow::bail!("timed out waiting for {what}");
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(())
    }
}

impl Drop for MockRestApi {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn slow_handler(State(counters): State<Arc<SlowCounters>>) -> Response {
    counters.started.fetch_add(1, Ordering::SeqCst);
    let mut guard = AbandonGuard {
        counters,
        finished: false,
    };
    tokio::time::sleep(SLOW_RESPONSE_DELAY).await;
    guard.finished = true;
    Json(json!({"status": "slow"})).into_response()
}

async fn mock_handler(request: Request) -> Response {
    let method = request.method().clone();
    let uri: Uri = request.uri().clone();
    let (authorization, api_key, content_type) = {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        (
            header("authorization"),
            header("x-api-key"),
            header("content-type"),
        )
    };

    match uri.path() {
        "/api/test" if method == axum::http::Method::GET => {
            Json(json!({"status": "ok"})).into_response()
        }
        path if path.starts_with("/api/echo") => {
            let body = axum::body::to_bytes(request.into_body(), 1024 * 1024)
                .await
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default();
            Json(json!({
                "method": method.as_str(),
                "path": path,
                "query": uri.query(),
                "authorization": authorization,
                "apiKey": api_key,
                "contentType": content_type,
                "body": serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body)),
            }))
            .into_response()
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response(),
    }
}
