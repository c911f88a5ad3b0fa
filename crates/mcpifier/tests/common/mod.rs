#![allow(dead_code)]

use anyhow::Context as _;
use serde_json::Value;
use std::io::{BufRead as _, BufReader, Write as _};
use std::process::{ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

pub use mcpifier_test_support::{KillOnDrop, MockRestApi};

pub fn pick_unused_port() -> anyhow::Result<u16> {
    mcpifier_test_support::pick_unused_port()
}

pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    mcpifier_test_support::wait_http_ok(url, timeout_dur).await
}

/// Config with four tools against `base_url`: `test_tool` (GET /api/test), `missing_tool`
/// (GET /api/missing), `echo_item` and `slow_tool` (GET /api/slow).
pub fn write_config(base_url: &str, extra: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let cfg = format!(
        r#"
mcpifier:
  rest:
    baseAddress: "{base_url}"
    defaultHeaders:
      X-Api-Key: test-key
    forwardedHeaders: [Authorization]
{extra}
  tools:
    - mcp:
        name: test_tool
        description: Returns ok
      rest:
        method: GET
        path: /api/test
    - mcp:
        name: missing_tool
      rest:
        method: GET
        path: /api/missing
    - mcp:
        name: echo_item
        inputSchema:
          type: object
          properties:
            id: {{ type: integer }}
            q: {{ type: string }}
            payload: {{ type: object }}
          required: [id]
      rest:
        method: POST
        path: "/api/echo/items/{{id}}"
        query: "q={{q}}"
        body: "{{payload}}"
    - mcp:
        name: slow_tool
      rest:
        method: GET
        path: /api/slow
"#
    );

    let file = tempfile::NamedTempFile::new().context("create temp config")?;
    std::fs::write(file.path(), cfg).context("write temp config")?;
    Ok(file)
}

pub fn spawn_http(config_path: &std::path::Path, port: u16) -> anyhow::Result<KillOnDrop> {
    let bin = env!("CARGO_BIN_EXE_mcpifier");
    let child = Command::new(bin)
        .arg("serve")
        .arg("--mode")
        .arg("http")
        .arg("--config")
        .arg(config_path)
        .arg("--bind")
        .arg(format!("127.0.0.1:{port}"))
        .stdin(Stdio::null())
        .spawn()
        .context("spawn mcpifier")?;
    Ok(KillOnDrop(child))
}

/// A running `mcpifier serve --mode stdio` with line-oriented access to its pipes.
pub struct StdioServer {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    child: KillOnDrop,
}

impl StdioServer {
    pub fn with_config(config_path: &std::path::Path) -> anyhow::Result<Self> {
        Self::spawn([std::ffi::OsStr::new("--config"), config_path.as_os_str()])
    }

    pub fn spawn<I, S>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let bin = env!("CARGO_BIN_EXE_mcpifier");
        let mut child = Command::new(bin)
            .arg("serve")
            .arg("--mode")
            .arg("stdio")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .context("spawn mcpifier")?;
        let stdin = child.stdin.take().context("child stdin")?;
        let stdout = child.stdout.take().context("child stdout")?;
        Ok(Self {
            stdin,
            stdout: BufReader::new(stdout),
            child: KillOnDrop(child),
        })
    }

    pub fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        writeln!(self.stdin, "{line}").context("write request")?;
        self.stdin.flush().context("flush request")
    }

    pub fn read_message(&mut self) -> anyhow::Result<Value> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line).context("read response")?;
        anyhow::ensure!(n > 0, "server closed stdout");
        serde_json::from_str(&line).with_context(|| format!("parse response line {line:?}"))
    }

    pub fn request(&mut self, message: &Value) -> anyhow::Result<Value> {
        self.send_line(&message.to_string())?;
        self.read_message()
    }

    /// Close stdin and wait for the process to exit on EOF.
    pub fn finish(mut self) -> anyhow::Result<std::process::ExitStatus> {
        drop(self.stdin);
        let mut rest = String::new();
        self.stdout.read_line(&mut rest).context("drain stdout")?;
        anyhow::ensure!(rest.is_empty(), "unexpected output after EOF: {rest:?}");
        self.child.0.wait().context("wait for exit")
    }
}
