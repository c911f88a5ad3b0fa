//! Newline-delimited JSON-RPC over a byte stream (stdin/stdout in production).

use crate::dispatcher::{HandlerTable, JsonRpcDispatcher};
use crate::error::Result;
use crate::handlers::RequestContext;
use crate::jsonrpc::{JsonRpcResponse, decode_request_slice};
use axum::http::HeaderMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Serve requests one line at a time until EOF or `shutdown`.
///
/// Requests are handled strictly in order; each response is written as one line and flushed.
/// A request already being dispatched when `shutdown` fires is allowed to finish.
///
/// # Errors
///
/// Returns an error if reading the input, serializing a response or writing the output fails.
pub async fn serve_stdio<T, R, W>(
    dispatcher: &JsonRpcDispatcher<T>,
    mut input: R,
    mut output: W,
    shutdown: CancellationToken,
) -> Result<()>
where
    T: HandlerTable,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Serving MCP over stdio");
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("stdio transport shutting down");
                break;
            }
            read = input.read_until(b'\n', &mut line) => read?,
        };
        if read == 0 {
            debug!("input closed");
            break;
        }

        let response = match decode_request_slice(trim_line_ending(&line)) {
            Ok(request) => {
                let ctx = RequestContext::new(HeaderMap::new(), CancellationToken::new());
                dispatcher.dispatch(&request, &ctx).await
            }
            Err(response) => response,
        };
        write_response(&mut output, &response).await?;
    }

    Ok(())
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn write_response<W>(output: &mut W, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let Some(wire) = response.to_wire() else {
        return Ok(());
    };
    let mut bytes = serde_json::to_vec(&wire)?;
    bytes.push(b'\n');
    output.write_all(&bytes).await?;
    output.flush().await?;
    Ok(())
}
