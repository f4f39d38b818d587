//! A single stdio-framed MCP subprocess connection (spec.md §4.7).
//!
//! Grounded directly on `original_source/core/mcp_client.py::MCPConnection`:
//! JSON-RPC 2.0, one LF-terminated JSON message per line on the child's
//! stdin/stdout, per-connection monotonically increasing request ids, and
//! a 5-second terminate-then-kill disconnect. The spawn shape follows
//! `clawft-platform::process::NativeProcessSpawner`'s `tokio::process`
//! usage, adapted from one-shot output capture to a long-lived piped
//! stdio session.

use itak_types::mcp::{MCPServerConfig, MCPTool};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::Mutex;

const CLIENT_NAME: &str = "iTaK";
const CLIENT_VERSION: &str = "0.5.0";
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Result of a `tools/call` invocation: the raw `result` object on
/// success, or an error string (spec.md §4.7 "CallTool").
pub enum CallOutcome {
    Result(Value),
    Error(String),
}

struct Io {
    stdin: ChildStdin,
    stdout: BufReader<tokio::process::ChildStdout>,
}

/// A live connection to one MCP server. All request/response traffic is
/// serialized through an internal lock, matching spec.md §4.7's "at most
/// one in-flight request per connection."
pub struct MCPConnection {
    config: MCPServerConfig,
    child: Mutex<Option<Child>>,
    io: Mutex<Option<Io>>,
    next_id: Mutex<u64>,
    tools: Mutex<Vec<MCPTool>>,
    connected: std::sync::atomic::AtomicBool,
}

impl MCPConnection {
    pub fn new(config: MCPServerConfig) -> Self {
        Self {
            config,
            child: Mutex::new(None),
            io: Mutex::new(None),
            next_id: Mutex::new(0),
            tools: Mutex::new(Vec::new()),
            connected: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub async fn tools(&self) -> Vec<MCPTool> {
        self.tools.lock().await.clone()
    }

    /// Spawns the child process, performs the `initialize` handshake, and
    /// discovers tools. Returns `false` on any failure, leaving the
    /// connection unusable (spec.md §4.7 step 5).
    pub async fn connect(&self) -> bool {
        let mut cmd = tokio::process::Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        for (key, value) in &self.config.env {
            cmd.env(key, value.expose());
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(_) => return false,
        };

        let stdin = match child.stdin.take() {
            Some(s) => s,
            None => return false,
        };
        let stdout = match child.stdout.take() {
            Some(s) => BufReader::new(s),
            None => return false,
        };

        *self.child.lock().await = Some(child);
        *self.io.lock().await = Some(Io { stdin, stdout });

        let init_timeout = Duration::from_secs(self.config.init_timeout_s);
        let init_params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": CLIENT_NAME, "version": CLIENT_VERSION },
        });

        let init_response = match tokio::time::timeout(init_timeout, self.send_request("initialize", init_params)).await {
            Ok(Some(resp)) if resp.get("result").is_some() => resp,
            _ => {
                self.disconnect().await;
                return false;
            }
        };
        let _ = init_response;

        self.send_notification("notifications/initialized", json!({})).await;
        self.connected.store(true, std::sync::atomic::Ordering::SeqCst);

        if tokio::time::timeout(init_timeout, self.discover_tools()).await.is_err() {
            self.disconnect().await;
            return false;
        }

        true
    }

    async fn discover_tools(&self) {
        let Some(response) = self.send_request("tools/list", json!({})).await else {
            return;
        };
        let Some(tools_data) = response.get("result").and_then(|r| r.get("tools")).and_then(Value::as_array) else {
            return;
        };
        let discovered = tools_data
            .iter()
            .map(|t| MCPTool {
                name: t.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                description: t.get("description").and_then(Value::as_str).unwrap_or_default().to_string(),
                input_schema: t.get("inputSchema").cloned().unwrap_or(Value::Object(Default::default())),
                server_name: self.config.name.clone(),
            })
            .collect();
        *self.tools.lock().await = discovered;
    }

    /// Terminates the child, waiting up to 5s before force-killing
    /// (spec.md §4.7 "Disconnect").
    pub async fn disconnect(&self) {
        self.connected.store(false, std::sync::atomic::Ordering::SeqCst);
        *self.io.lock().await = None;
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.start_kill();
            if tokio::time::timeout(Duration::from_secs(5), child.wait()).await.is_err() {
                let _ = child.kill().await;
            }
        }
    }

    /// Calls `tools/call` with `tool_name`/`arguments`, honoring
    /// `tool_timeout_s` (spec.md §4.7 "CallTool").
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> CallOutcome {
        if !self.is_connected() {
            return CallOutcome::Error("Not connected".to_string());
        }
        let timeout = Duration::from_secs(self.config.tool_timeout_s);
        let params = json!({ "name": tool_name, "arguments": arguments });

        match tokio::time::timeout(timeout, self.send_request("tools/call", params)).await {
            Ok(Some(response)) => {
                if let Some(result) = response.get("result") {
                    CallOutcome::Result(result.clone())
                } else if let Some(error) = response.get("error") {
                    CallOutcome::Error(error.to_string())
                } else {
                    CallOutcome::Error("No response from MCP server".to_string())
                }
            }
            Ok(None) => CallOutcome::Error("No response from MCP server".to_string()),
            Err(_) => CallOutcome::Error(format!("Tool call timed out after {}s", self.config.tool_timeout_s)),
        }
    }

    async fn send_request(&self, method: &str, params: Value) -> Option<Value> {
        let id = {
            let mut next_id = self.next_id.lock().await;
            *next_id += 1;
            *next_id
        };
        let request = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        let line = format!("{}\n", serde_json::to_string(&request).ok()?);

        let mut io_guard = self.io.lock().await;
        let io = io_guard.as_mut()?;
        io.stdin.write_all(line.as_bytes()).await.ok()?;
        io.stdin.flush().await.ok()?;

        let mut response_line = String::new();
        let n = io.stdout.read_line(&mut response_line).await.ok()?;
        if n == 0 {
            return None;
        }
        serde_json::from_str(response_line.trim_end()).ok()
    }

    async fn send_notification(&self, method: &str, params: Value) {
        let notification = json!({ "jsonrpc": "2.0", "method": method, "params": params });
        let Ok(serialized) = serde_json::to_string(&notification) else { return };
        let line = format!("{serialized}\n");

        let mut io_guard = self.io.lock().await;
        if let Some(io) = io_guard.as_mut() {
            let _ = io.stdin.write_all(line.as_bytes()).await;
            let _ = io.stdin.flush().await;
        }
    }
}
