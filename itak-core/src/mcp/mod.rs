//! Multi-server MCP client: connect/discover/call/disconnect across N
//! stdio subprocesses (spec.md §4.7).
//!
//! Grounded directly on `original_source/core/mcp_client.py::MCPClient`'s
//! `server::tool`-qualified lookup and per-server connection map.

mod connection;

pub use connection::{CallOutcome, MCPConnection};

use crate::tools::McpLookup;
use itak_types::mcp::{MCPServerConfig, MCPTool};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Owns one [`MCPConnection`] per configured server and resolves
/// `server::tool` or bare tool names across them.
pub struct MCPClient {
    configs: Vec<MCPServerConfig>,
    connections: RwLock<HashMap<String, Arc<MCPConnection>>>,
}

impl MCPClient {
    pub fn new(configs: Vec<MCPServerConfig>) -> Self {
        Self { configs, connections: RwLock::new(HashMap::new()) }
    }

    /// Connects every configured server, returning per-server success.
    /// Failed servers are simply absent from the connection map
    /// (spec.md §4.7 "Connect", step 5 "leave the connection in an
    /// un-usable state").
    pub async fn connect_all(&self) -> HashMap<String, bool> {
        let mut results = HashMap::new();
        for config in &self.configs {
            let conn = Arc::new(MCPConnection::new(config.clone()));
            let ok = conn.connect().await;
            results.insert(config.name.clone(), ok);
            if ok {
                self.connections.write().await.insert(config.name.clone(), conn);
            }
        }
        results
    }

    pub async fn disconnect_all(&self) {
        let mut connections = self.connections.write().await;
        for conn in connections.values() {
            conn.disconnect().await;
        }
        connections.clear();
    }

    pub async fn list_tools(&self) -> Vec<MCPTool> {
        let mut tools = Vec::new();
        for conn in self.connections.read().await.values() {
            tools.extend(conn.tools().await);
        }
        tools
    }

    /// Looks up a tool by `server::tool` or, failing that, a bare name
    /// searched across every connected server.
    pub async fn get_tool(&self, full_name: &str) -> Option<MCPTool> {
        if let Some((server_name, tool_name)) = full_name.split_once("::") {
            let connections = self.connections.read().await;
            let conn = connections.get(server_name)?;
            return conn.tools().await.into_iter().find(|t| t.name == tool_name);
        }
        for conn in self.connections.read().await.values() {
            if let Some(tool) = conn.tools().await.into_iter().find(|t| t.name == full_name) {
                return Some(tool);
            }
        }
        None
    }

    /// Calls a tool by `server::tool` (direct dispatch) or bare name
    /// (searched across servers), per spec.md §4.7 "CallTool".
    pub async fn call_tool(&self, full_name: &str, arguments: Value) -> CallOutcome {
        if let Some((server_name, tool_name)) = full_name.split_once("::") {
            let connections = self.connections.read().await;
            return match connections.get(server_name) {
                Some(conn) => conn.call_tool(tool_name, arguments).await,
                None => CallOutcome::Error(format!("MCP server '{server_name}' not connected")),
            };
        }

        let connections = self.connections.read().await;
        for conn in connections.values() {
            if conn.tools().await.iter().any(|t| t.name == full_name) {
                return conn.call_tool(full_name, arguments).await;
            }
        }
        CallOutcome::Error(format!("MCP tool '{full_name}' not found"))
    }

    pub fn configured_count(&self) -> usize {
        self.configs.len()
    }

    pub async fn connected_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

/// Synchronous `McpLookup` view backed by a pre-fetched tool name set,
/// built once per `ToolRegistry::resolve` window since `McpLookup::has_tool`
/// is non-async but the underlying tool list lives behind an async lock.
/// Callers refresh this after each `connect_all`/`disconnect_all`.
pub struct McpToolNames(std::collections::HashSet<String>);

impl McpToolNames {
    pub async fn snapshot(client: &MCPClient) -> Self {
        let names = client.list_tools().await.into_iter().map(|t| t.name).collect();
        Self(names)
    }
}

impl McpLookup for McpToolNames {
    fn has_tool(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}
