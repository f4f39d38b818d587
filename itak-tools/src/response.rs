//! The `response` tool: the only built-in way to end a monologue turn
//! (spec.md §4.3, §4.1 step 9 "`break_loop`").
//!
//! Grounded on `original_source/core/agent.py`'s built-in tool set (the
//! model always has a `response` tool to finish with) and on
//! `clawft-core::tools::registry::Tool`'s trait shape.

use async_trait::async_trait;
use itak_core::tools::Tool;
use itak_types::tool::ToolResult;
use itak_types::Result;
use std::collections::HashMap;

/// Ends the turn, returning `message` as the final reply.
pub struct ResponseTool;

#[async_trait]
impl Tool for ResponseTool {
    fn name(&self) -> &str {
        "response"
    }

    async fn execute(&self, args: HashMap<String, serde_json::Value>) -> Result<ToolResult> {
        let message = args.get("message").and_then(|v| v.as_str()).unwrap_or_default();
        Ok(ToolResult::break_loop(message))
    }
}
