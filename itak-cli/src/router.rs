//! A minimal OpenAI-compatible chat completion client implementing
//! `ModelRouterPort`.
//!
//! `itak_core::ports::ModelRouterPort` treats the model provider as an
//! opaque `Chat(messages) -> text` port (spec.md §1); the teacher's
//! `clawft-llm` crate implements a full multi-provider router with
//! failover and streaming SSE parsing, which is out of scope for this
//! binary's demo wiring (DESIGN.md notes the drop). This client talks to
//! a single configured endpoint, non-streaming: `on_chunk` fires once
//! with the complete response text.

use async_trait::async_trait;
use itak_core::ports::{ChatRequest, ModelRouterPort};
use itak_types::message::Role;
use itak_types::secret::SecretString;
use itak_types::{ItakError, Result};
use serde_json::json;

pub struct OpenAiCompatRouter {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiCompatRouter {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }

    async fn complete_chat(&self, messages: Vec<serde_json::Value>) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({ "model": self.model, "messages": messages });

        let response = self
            .client
            .post(url)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|err| ItakError::Provider { message: format!("chat request failed: {err}") })?;

        if !response.status().is_success() {
            return Err(ItakError::Provider { message: format!("chat API returned status {}", response.status()) });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|err| ItakError::Provider { message: format!("failed to parse chat response: {err}") })?;

        payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| ItakError::Provider { message: "chat response missing choices[0].message.content".into() })
    }
}

#[async_trait]
impl ModelRouterPort for OpenAiCompatRouter {
    async fn chat(&self, request: ChatRequest<'_>, on_chunk: &(dyn Fn(&str) + Send + Sync)) -> Result<String> {
        let messages: Vec<_> = request
            .messages
            .iter()
            .map(|m| json!({ "role": Self::role_str(m.role), "content": m.content }))
            .collect();
        let text = self.complete_chat(messages).await?;
        on_chunk(&text);
        Ok(text)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.complete_chat(vec![json!({ "role": "user", "content": prompt })]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_str_maps_all_variants() {
        assert_eq!(OpenAiCompatRouter::role_str(Role::User), "user");
        assert_eq!(OpenAiCompatRouter::role_str(Role::Assistant), "assistant");
        assert_eq!(OpenAiCompatRouter::role_str(Role::System), "system");
        assert_eq!(OpenAiCompatRouter::role_str(Role::Tool), "tool");
    }
}
