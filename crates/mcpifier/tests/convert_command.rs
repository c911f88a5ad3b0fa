mod common;

use anyhow::Context as _;
use common::{MockRestApi, StdioServer};
use serde_json::{Value, json};
use std::process::Command;

fn write_openapi(dir: &std::path::Path, base_url: &str) -> anyhow::Result<std::path::PathBuf> {
    let spec = format!(
        r#"
openapi: "3.0.3"
info: {{ title: Mock, version: "1" }}
servers:
  - url: "{base_url}"
paths:
  /api/test:
    get:
      operationId: getStatus
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: object
                properties:
                  status: {{ type: string }}
  /api/echo/items/{{itemId}}:
    post:
      summary: Echo an item
      parameters:
        - name: itemId
          in: path
          required: true
          schema: {{ type: integer }}
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                label: {{ type: string }}
      responses:
        "200":
          description: echoed
"#
    );
    let path = dir.join("openapi.yaml");
    std::fs::write(&path, spec).context("write openapi document")?;
    Ok(path)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn converted_mappings_serve_tools() -> anyhow::Result<()> {
    let api = MockRestApi::start().await?;
    let dir = tempfile::tempdir().context("tempdir")?;
    let spec = write_openapi(dir.path(), &api.base_url)?;
    let mappings = dir.path().join("mappings.json");

    let status = Command::new(env!("CARGO_BIN_EXE_mcpifier"))
        .arg("convert")
        .arg(&spec)
        .arg("--output")
        .arg(&mappings)
        .status()
        .context("run convert")?;
    assert!(status.success(), "convert exited with {status}");

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&mappings)?)?;
    assert_eq!(written["mcpifier"]["rest"]["baseAddress"], json!(api.base_url));
    let names: Vec<_> = written["mcpifier"]["tools"]
        .as_array()
        .context("tools array")?
        .iter()
        .filter_map(|t| t["mcp"]["name"].as_str())
        .collect();
    assert_eq!(names, vec!["get_status", "echo_item"]);

    let mut server = StdioServer::spawn([
        std::ffi::OsStr::new("--mappings"),
        mappings.as_os_str(),
    ])?;

    let status = server.request(&json!({
        "jsonrpc": "2.0", "id": 1, "method": "tools/call",
        "params": {"name": "get_status", "arguments": {}}
    }))?;
    assert_eq!(status["result"]["structuredContent"], json!({"status": "ok"}));

    let echoed = server.request(&json!({
        "jsonrpc": "2.0", "id": 2, "method": "tools/call",
        "params": {"name": "echo_item", "arguments": {"itemId": 5, "requestBody": {"label": "x"}}}
    }))?;
    let body = &echoed["result"]["structuredContent"];
    assert_eq!(body["path"], json!("/api/echo/items/5"));
    assert_eq!(body["body"], json!({"label": "x"}));
    Ok(())
}

#[test]
fn convert_reports_missing_document() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let output = Command::new(env!("CARGO_BIN_EXE_mcpifier"))
        .arg("convert")
        .arg(dir.path().join("nope.yaml"))
        .arg("--output")
        .arg(dir.path().join("mappings.json"))
        .output()
        .context("run convert")?;
    assert!(!output.status.success());
    assert!(!dir.path().join("mappings.json").exists());
    Ok(())
}
