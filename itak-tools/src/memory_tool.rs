//! Thin `MemoryPort`-backed tools: `memory_search` and `memory_save`.
//!
//! Grounded on `clawft-tools::memory_tool`'s read/write tool pair, with
//! the actual storage delegated to `itak_core::ports::MemoryPort`
//! rather than a hand-rolled MEMORY.md reader (that backend is out of
//! scope here; only the port is specified).

use async_trait::async_trait;
use itak_core::ports::MemoryPort;
use itak_core::tools::Tool;
use itak_types::tool::ToolResult;
use itak_types::Result;
use std::collections::HashMap;
use std::sync::Arc;

pub struct MemorySearchTool {
    memory: Arc<dyn MemoryPort>,
}

impl MemorySearchTool {
    pub fn new(memory: Arc<dyn MemoryPort>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for MemorySearchTool {
    fn name(&self) -> &str {
        "memory_search"
    }

    async fn execute(&self, args: HashMap<String, serde_json::Value>) -> Result<ToolResult> {
        let Some(query) = args.get("query").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::failed("missing required field: query"));
        };
        let limit = args.get("limit").and_then(|v| v.as_u64()).unwrap_or(5) as usize;

        let hits = self.memory.search(query, limit).await?;
        if hits.is_empty() {
            return Ok(ToolResult::ok("No matching memories found."));
        }
        let rendered = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| format!("{}. (score {:.2}) {}", i + 1, hit.score, hit.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(ToolResult::ok(rendered))
    }
}

pub struct MemorySaveTool {
    memory: Arc<dyn MemoryPort>,
}

impl MemorySaveTool {
    pub fn new(memory: Arc<dyn MemoryPort>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for MemorySaveTool {
    fn name(&self) -> &str {
        "memory_save"
    }

    async fn execute(&self, args: HashMap<String, serde_json::Value>) -> Result<ToolResult> {
        let Some(content) = args.get("content").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::failed("missing required field: content"));
        };
        let category = args.get("category").and_then(|v| v.as_str()).unwrap_or("general");

        self.memory.save(category, content).await?;
        Ok(ToolResult::ok(format!("Saved to memory under '{category}'.")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itak_core::ports::{MemoryHealth, MemoryHit};

    struct FakeMemory;

    #[async_trait]
    impl MemoryPort for FakeMemory {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<MemoryHit>> {
            Ok(vec![MemoryHit { content: "prior note about deploys".into(), score: 0.9 }])
        }
        async fn save(&self, _category: &str, _content: &str) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _content: &str) -> Result<()> {
            Ok(())
        }
        async fn health(&self) -> MemoryHealth {
            MemoryHealth { healthy: true, detail: "ok".into() }
        }
        async fn reconnect(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn search_renders_hits() {
        let tool = MemorySearchTool::new(Arc::new(FakeMemory));
        let mut args = HashMap::new();
        args.insert("query".to_string(), serde_json::json!("deploy"));
        let result = tool.execute(args).await.unwrap();
        assert!(result.output.contains("prior note about deploys"));
    }

    #[tokio::test]
    async fn save_confirms_category() {
        let tool = MemorySaveTool::new(Arc::new(FakeMemory));
        let mut args = HashMap::new();
        args.insert("content".to_string(), serde_json::json!("remember this"));
        args.insert("category".to_string(), serde_json::json!("notes"));
        let result = tool.execute(args).await.unwrap();
        assert!(result.output.contains("notes"));
    }
}
