//! Narrow port traits for subsystems specified only by contract (spec.md
//! §1, §6): transport adapters, the LLM provider, and memory backends.
//!
//! Grounded on `clawft-core`'s `Platform`-trait-as-narrow-port
//! dependency-injection pattern (SPEC_FULL.md §D) rather than the Python
//! original's duck-typed `hasattr(agent, ...)` dispatch, which spec.md §9
//! explicitly calls out for replacement.

use async_trait::async_trait;
use itak_types::Result;

/// The contract a transport adapter (Discord/Telegram/Slack/CLI/WebUI) must
/// honor (spec.md §6 "AdapterPort"). Adapters are out of scope; only this
/// interface is specified.
#[async_trait]
pub trait AdapterPort: Send + Sync {
    /// Stable identifier for this adapter, used in log records and
    /// checkpoint snapshots (e.g. `"discord"`, `"cli"`).
    fn name(&self) -> &str;

    /// Sends sanitized outbound text to the user, honoring the transport's
    /// chunk size (Discord 1900, Telegram 4000, Slack 3000 per spec.md §6).
    async fn send(&self, room_id: &str, text: &str) -> Result<()>;

    /// Reports a progress event for display (e.g. a Discord embed edit or
    /// a CLI progress line). Adapters that don't support live updates may
    /// no-op.
    async fn report_progress(&self, room_id: &str, event: &crate::progress::ProgressEvent) -> Result<()>;
}

/// A chat completion request: the full message history plus a streaming
/// callback invoked once per delta.
pub struct ChatRequest<'a> {
    pub messages: &'a [itak_types::message::Message],
}

/// The opaque LLM provider port (spec.md §1: "treated as an opaque
/// `ModelRouter.Chat(messages) -> text` port").
#[async_trait]
pub trait ModelRouterPort: Send + Sync {
    /// Sends `request` to the model and returns its full text response.
    /// `on_chunk` fires once per streamed delta, in arrival order, with no
    /// suspension guarantee beyond that (spec.md §4.1 step 5).
    async fn chat(
        &self,
        request: ChatRequest<'_>,
        on_chunk: &(dyn Fn(&str) + Send + Sync),
    ) -> Result<String>;

    /// Sends a one-shot, non-streaming prompt -- used by `SelfHealEngine`'s
    /// reasoning step (spec.md §4.4 step 5) and by extension hooks that
    /// need a quick model call without the conversational loop.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Health of a memory backend, as reported to `HeartbeatMonitor`
/// (SPEC_FULL.md §C.6).
#[derive(Debug, Clone)]
pub struct MemoryHealth {
    pub healthy: bool,
    pub detail: String,
}

/// A single memory search hit.
#[derive(Debug, Clone)]
pub struct MemoryHit {
    pub content: String,
    pub score: f32,
}

/// The search/save/delete/stats contract for memory backends (spec.md §1
/// "MemoryPort"). Backends (markdown files, SQLite, Neo4j, Weaviate, a MemU
/// extractor) are out of scope; only this interface is specified.
#[async_trait]
pub trait MemoryPort: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryHit>>;
    async fn save(&self, category: &str, content: &str) -> Result<()>;
    async fn delete(&self, content: &str) -> Result<()>;
    async fn health(&self) -> MemoryHealth;
    async fn reconnect(&self) -> Result<()>;
}
