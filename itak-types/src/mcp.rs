//! MCP server and tool configuration types (spec.md §3, §4.7).
//!
//! Grounded directly on `original_source/core/mcp_client.py`'s dataclasses.

use crate::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static configuration for one MCP child process, as loaded from
/// `mcp_servers.mcpServers` in config (spec.md §4.7 "Connect").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, SecretString>,
    #[serde(default = "default_init_timeout_s")]
    pub init_timeout_s: u64,
    #[serde(default = "default_tool_timeout_s")]
    pub tool_timeout_s: u64,
}

fn default_init_timeout_s() -> u64 {
    10
}

fn default_tool_timeout_s() -> u64 {
    120
}

/// One capability discovered from an MCP server's `tools/list` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MCPTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    pub server_name: String,
}

impl MCPTool {
    /// The `server::tool` qualified name used by `ToolRegistry` resolution
    /// rule 1 (spec.md §4.3).
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.server_name, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_joins_with_double_colon() {
        let tool = MCPTool {
            name: "search".into(),
            description: "".into(),
            input_schema: serde_json::json!({}),
            server_name: "brave".into(),
        };
        assert_eq!(tool.qualified_name(), "brave::search");
    }

    #[test]
    fn server_config_defaults_match_spec_timeouts() {
        let json = r#"{"name":"fs","command":"mcp-fs"}"#;
        let cfg: MCPServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.init_timeout_s, 10);
        assert_eq!(cfg.tool_timeout_s, 120);
    }
}
