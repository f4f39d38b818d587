//! The `unknown` fallback tool, registered under the bare name
//! `"unknown"` so `ToolRegistry::resolve` rule 4 (spec.md §4.3) has
//! somewhere to send an unrecognized tool call instead of failing
//! outright.

use async_trait::async_trait;
use itak_core::tools::Tool;
use itak_types::tool::ToolResult;
use itak_types::Result;
use std::collections::HashMap;

/// Echoes back the call it couldn't resolve, so the model sees its
/// mistake and can retry with a real tool name.
pub struct UnknownTool;

#[async_trait]
impl Tool for UnknownTool {
    fn name(&self) -> &str {
        "unknown"
    }

    async fn execute(&self, args: HashMap<String, serde_json::Value>) -> Result<ToolResult> {
        let tool_name = args.get("tool_name").and_then(|v| v.as_str()).unwrap_or("?");
        Ok(ToolResult::failed(format!(
            "Tool '{tool_name}' does not exist. Check the tool name and try again."
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_the_unresolved_tool_name() {
        let tool = UnknownTool;
        let mut args = HashMap::new();
        args.insert("tool_name".to_string(), serde_json::json!("frobnicate"));
        let result = tool.execute(args).await.unwrap();
        assert!(result.output.contains("frobnicate"));
        assert!(result.error);
        assert!(!result.break_loop);
    }
}
