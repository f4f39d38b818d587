//! The `web_fetch` tool, one of spec.md §6's untrusted-content tools.
//!
//! Grounded on `clawft-tools::web_fetch::WebFetchTool`: URL-scheme
//! validation, a bounded response size, method/header passthrough.
//! Adapted to a direct `reqwest::Client` (no `Platform` indirection
//! here).

use async_trait::async_trait;
use itak_core::tools::Tool;
use itak_types::tool::ToolResult;
use itak_types::{ItakError, Result};
use std::collections::HashMap;

/// Caps the response body read so a single fetch can't exhaust memory.
const MAX_RESPONSE_BYTES: usize = 1_048_576;

pub struct WebFetchTool {
    client: reqwest::Client,
}

impl WebFetchTool {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for WebFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "web_fetch"
    }

    async fn execute(&self, args: HashMap<String, serde_json::Value>) -> Result<ToolResult> {
        let Some(url) = args.get("url").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::failed("missing required field: url"));
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Ok(ToolResult::failed("url must start with http:// or https://"));
        }
        let method = args.get("method").and_then(|v| v.as_str()).unwrap_or("GET").to_uppercase();

        let mut request = self
            .client
            .request(method.parse().unwrap_or(reqwest::Method::GET), url);
        if let Some(headers) = args.get("headers").and_then(|v| v.as_object()) {
            for (key, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(key, value);
                }
            }
        }

        let response = request
            .send()
            .await
            .map_err(|err| ItakError::Provider { message: format!("fetch failed: {err}") })?;
        if !response.status().is_success() {
            return Err(ItakError::Provider { message: format!("fetch returned status {}", response.status()) });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| ItakError::Provider { message: format!("failed to read response body: {err}") })?;
        let truncated = bytes.len() > MAX_RESPONSE_BYTES;
        let body = String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_RESPONSE_BYTES)]).into_owned();
        Ok(ToolResult::ok(if truncated {
            format!("{body}\n[truncated at {MAX_RESPONSE_BYTES} bytes]")
        } else {
            body
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let tool = WebFetchTool::new();
        let mut args = HashMap::new();
        args.insert("url".to_string(), serde_json::json!("file:///etc/passwd"));
        let result = tool.execute(args).await.unwrap();
        assert!(result.error);
    }

    #[tokio::test]
    async fn missing_url_fails_gracefully() {
        let tool = WebFetchTool::new();
        let result = tool.execute(HashMap::new()).await.unwrap();
        assert!(result.error);
        assert!(result.output.contains("url"));
    }
}
