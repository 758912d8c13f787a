use anyhow::Context as _;
use serde_json::{Value, json};
use std::io::{BufRead as _, BufReader, Write as _};
use std::process::{ChildStdin, Command, Stdio};
use std::time::Duration;
use tokio::sync::mpsc;

pub use ga4_test_support::{KillOnDrop, TestHttpServer, service_account_key};

pub const BIN: &str = env!("CARGO_BIN_EXE_ga4-mcp-server");

/// Variables the binary reads; cleared before each spawn so the host environment can't leak in.
const SERVER_VARS: [&str; 7] = [
    "GOOGLE_CLIENT_EMAIL",
    "GOOGLE_PRIVATE_KEY",
    "GA_PROPERTY_ID",
    "GA_API_BASE_URL",
    "GOOGLE_TOKEN_URI",
    "GA4_MCP_LOG",
    "GA4_MCP_LOG_FORMAT",
];

/// A server command with a clean environment, run outside the workspace so no `.env` is found.
pub fn server_command(envs: &[(&str, &str)]) -> Command {
    let mut cmd = Command::new(BIN);
    cmd.current_dir(std::env::temp_dir());
    for var in SERVER_VARS {
        cmd.env_remove(var);
    }
    cmd.envs(envs.iter().copied());
    cmd
}

/// Minimal MCP client speaking newline-delimited JSON-RPC to a spawned server.
pub struct McpStdioSession {
    _child: KillOnDrop,
    stdin: ChildStdin,
    lines: mpsc::UnboundedReceiver<String>,
}

impl McpStdioSession {
    pub fn spawn(envs: &[(&str, &str)]) -> anyhow::Result<Self> {
        let mut child = server_command(envs)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .context("spawn ga4-mcp-server")?;

        let stdin = child.stdin.take().context("child stdin")?;
        let stdout = child.stdout.take().context("child stdout")?;

        let (tx, lines) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            _child: KillOnDrop(child),
            stdin,
            lines,
        })
    }

    /// Spawn and complete the `initialize` handshake. Returns the `initialize` result.
    pub async fn connect(envs: &[(&str, &str)]) -> anyhow::Result<(Self, Value)> {
        let mut session = Self::spawn(envs)?;
        let init = session
            .request(
                0,
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "ga4-mcp-server-integration-tests", "version": "0" }
                }),
            )
            .await?;
        let result = init
            .get("result")
            .cloned()
            .context("initialize returned no result")?;

        session.notify("notifications/initialized")?;
        Ok((session, result))
    }

    pub fn notify(&mut self, method: &str) -> anyhow::Result<()> {
        self.send(&json!({ "jsonrpc": "2.0", "method": method }))
    }

    /// Send a request and wait for the response carrying the same id.
    pub async fn request(&mut self, id: u64, method: &str, params: Value) -> anyhow::Result<Value> {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))?;

        tokio::time::timeout(Duration::from_secs(15), async {
            loop {
                let line = self
                    .lines
                    .recv()
                    .await
                    .context("server closed stdout")?;
                let msg: Value = serde_json::from_str(&line)
                    .with_context(|| format!("stdout line is not JSON: {line}"))?;
                if msg.get("id") == Some(&json!(id)) {
                    return anyhow::Ok(msg);
                }
            }
        })
        .await
        .with_context(|| format!("timeout waiting for {method} response"))?
    }

    pub async fn call_tool(&mut self, id: u64, name: &str, arguments: Value) -> anyhow::Result<Value> {
        self.request(id, "tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }

    fn send(&mut self, msg: &Value) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(msg).context("serialize message")?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .context("write to server stdin")?;
        self.stdin.flush().context("flush server stdin")
    }
}

/// Parse `result.content[0].text` of a successful `tools/call` response.
pub fn tool_text_json(msg: &Value) -> anyhow::Result<Value> {
    let text = msg
        .get("result")
        .and_then(|r| r.get("content"))
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .with_context(|| format!("tools/call missing result.content[0].text: {msg}"))?;
    serde_json::from_str(text).context("tools/call text is not JSON")
}

/// `(code, message)` of a JSON-RPC error response.
pub fn rpc_error(msg: &Value) -> anyhow::Result<(i64, String)> {
    let err = msg
        .get("error")
        .with_context(|| format!("expected an error response: {msg}"))?;
    let code = err
        .get("code")
        .and_then(Value::as_i64)
        .context("error.code")?;
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .context("error.message")?
        .to_string();
    Ok((code, message))
}
