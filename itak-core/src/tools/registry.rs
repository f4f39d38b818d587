//! Tool trait and resolution rules (spec.md §4.3 "Resolution rules").
//!
//! Grounded on `original_source/core/agent.py::_process_tools`'s MCP-first
//! resolution order and the `clawft-core::tools::registry` pattern of a
//! name-keyed map of trait objects, generalized from clawft's LSP/file
//! tools to the dynamic local/MCP split this spec requires.

use async_trait::async_trait;
use itak_types::tool::{ToolCall, ToolResult};
use itak_types::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// A locally-registered tool (spec.md §4.3 "Local tools expose
/// `Execute(args) -> ToolResult`").
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    async fn execute(&self, args: HashMap<String, serde_json::Value>) -> Result<ToolResult>;
}

/// Outcome of resolving a [`ToolCall`] before invocation.
pub enum Resolution {
    /// `server::tool` or a bare name the MCP client recognizes.
    Mcp { qualified_name: String },
    /// A locally-registered tool, matched by exact name.
    Local(Arc<dyn Tool>),
    /// No match, but an `"unknown"` fallback tool is registered; its args
    /// become `{tool_name, tool_args}` (spec.md §4.3 rule 4).
    Unknown(Arc<dyn Tool>),
    /// No match and no fallback registered (spec.md §4.3 rule 5).
    NotFound,
}

/// A narrow view of the MCP client's tool table, sufficient for
/// resolution without pulling the full `MCPClient` (and its subprocess
/// lifecycle) into this module's dependency surface.
pub trait McpLookup: Send + Sync {
    fn has_tool(&self, name: &str) -> bool;
}

/// Name-keyed registry of local tools plus an optional MCP lookup,
/// implementing the five-rule resolution order from spec.md §4.3.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    mcp: Option<Arc<dyn McpLookup>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new(), mcp: None }
    }

    pub fn with_mcp_lookup(mut self, mcp: Arc<dyn McpLookup>) -> Self {
        self.mcp = Some(mcp);
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Resolves `call.tool_name` per spec.md §4.3's five ordered rules.
    pub fn resolve(&self, call: &ToolCall) -> Resolution {
        if call.tool_name.contains("::") {
            return Resolution::Mcp { qualified_name: call.tool_name.clone() };
        }
        if let Some(mcp) = &self.mcp {
            if mcp.has_tool(&call.tool_name) {
                return Resolution::Mcp { qualified_name: call.tool_name.clone() };
            }
        }
        if let Some(tool) = self.tools.get(&call.tool_name) {
            return Resolution::Local(tool.clone());
        }
        if let Some(unknown) = self.tools.get("unknown") {
            return Resolution::Unknown(unknown.clone());
        }
        Resolution::NotFound
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps `content` in the untrusted-external-content markers iff
/// `tool_name` is one of `itak_types::tool::UNTRUSTED_CONTENT_TOOLS`;
/// otherwise returns it unchanged (spec.md §6).
pub fn wrap_if_untrusted(tool_name: &str, content: String) -> String {
    if itak_types::tool::UNTRUSTED_CONTENT_TOOLS.contains(&tool_name) {
        itak_types::tool::wrap_untrusted(&content)
    } else {
        content
    }
}
