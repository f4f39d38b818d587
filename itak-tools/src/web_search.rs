//! The `web_search` tool, one of spec.md §6's untrusted-content tools.
//!
//! Grounded on `clawft-tools::web_search::WebSearchTool`'s "graceful
//! no-op when unconfigured" shape, adapted from the teacher's generic
//! `Platform::http()` indirection to a direct `reqwest::Client` (this
//! crate has no `Platform` abstraction to thread through).

use async_trait::async_trait;
use itak_core::tools::Tool;
use itak_types::tool::ToolResult;
use itak_types::{ItakError, Result};
use std::collections::HashMap;

/// Queries a configurable search API endpoint. Its output is untrusted
/// and gets wrapped by `itak_core::tools::registry::wrap_if_untrusted`
/// downstream; this tool itself just returns raw text.
pub struct WebSearchTool {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl WebSearchTool {
    pub fn new(endpoint: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    async fn execute(&self, args: HashMap<String, serde_json::Value>) -> Result<ToolResult> {
        let Some(query) = args.get("query").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::failed("missing required field: query"));
        };
        let num_results = args.get("num_results").and_then(|v| v.as_u64()).unwrap_or(5);

        let Some(endpoint) = self.endpoint.as_ref().filter(|e| !e.is_empty()) else {
            return Ok(ToolResult::failed(
                "web search is not configured; set tools.web_search.endpoint",
            ));
        };

        let response = self
            .client
            .get(endpoint)
            .query(&[("q", query), ("limit", &num_results.to_string())])
            .send()
            .await
            .map_err(|err| ItakError::Provider { message: format!("web search request failed: {err}") })?;

        if !response.status().is_success() {
            return Err(ItakError::Provider {
                message: format!("web search API returned status {}", response.status()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| ItakError::Provider { message: format!("failed to read search response: {err}") })?;
        Ok(ToolResult::ok(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_endpoint_fails_gracefully() {
        let tool = WebSearchTool::new(None);
        let mut args = HashMap::new();
        args.insert("query".to_string(), serde_json::json!("rust async traits"));
        let result = tool.execute(args).await.unwrap();
        assert!(result.error);
        assert!(result.output.contains("not configured"));
    }

    #[tokio::test]
    async fn missing_query_fails_gracefully() {
        let tool = WebSearchTool::new(Some("https://example.com/search".to_string()));
        let result = tool.execute(HashMap::new()).await.unwrap();
        assert!(result.error);
        assert!(result.output.contains("query"));
    }
}
