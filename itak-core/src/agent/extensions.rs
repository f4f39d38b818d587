//! Ordered hook registry fired at named points in the monologue loop
//! (spec.md §4.2).
//!
//! Grounded on `original_source/core/agent.py::_run_extensions` (dynamic
//! file-discovered plugin functions called in load order) and on
//! `clawft-core`'s async-trait-object extension points, per spec.md §9's
//! call to replace duck-typed dispatch with typed interfaces and
//! SPEC_FULL.md §D.3's resolution of Open Question #3 (hooks are fully
//! async, not `run_until_complete`-from-sync).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Sentinel a `tool_execute_after` hook returns to veto a tool's result
/// (spec.md §4.2, §4.1 step 9).
pub const SECURITY_BLOCKED: &str = "SECURITY_BLOCKED";

/// The 15 named points in the monologue loop where extensions may fire
/// (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    AgentInit,
    SystemPrompt,
    MonologueStart,
    MessageLoopStart,
    MessageLoopPromptsBefore,
    MessageLoopPromptsAfter,
    BeforeMainLlmCall,
    ResponseStreamChunk,
    ToolExecuteBefore,
    ToolExecuteAfter,
    HistAddToolResult,
    MessageLoopEnd,
    ProcessChainEnd,
    MonologueEnd,
    ErrorFormat,
}

/// Keyword-map-equivalent payload passed to an extension at fire time.
/// Hook implementations downcast the fields they care about; unused
/// fields are simply ignored, mirroring the original's `**kwargs` map.
#[derive(Debug, Clone, Default)]
pub struct HookPayload {
    pub prompt: Option<String>,
    pub messages: Option<Vec<itak_types::message::Message>>,
    pub chunk: Option<String>,
    pub tool_name: Option<String>,
    pub tool_args: Option<serde_json::Value>,
    pub result: Option<String>,
    pub user_message: Option<String>,
}

/// A hook's return value, collected into the fire's result list. Only
/// `tool_execute_after`'s `SECURITY_BLOCKED` string and `system_prompt`'s
/// replacement string carry meaning to the engine; everything else is
/// ignored (spec.md §4.2 contract).
#[derive(Debug, Clone)]
pub enum HookOutcome {
    None,
    Text(String),
}

/// One registered extension: a named, ordered hook implementation.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Stable name used for logging when the extension errors.
    fn name(&self) -> &str;
    async fn run(&self, payload: &HookPayload) -> itak_types::Result<HookOutcome>;
}

/// Ordered-by-hook registry of extensions, fired sequentially and never
/// concurrently within one hook (spec.md §4.2 "No concurrent invocation").
pub struct ExtensionPipeline {
    hooks: HashMap<Hook, Vec<Arc<dyn Extension>>>,
}

impl ExtensionPipeline {
    pub fn new() -> Self {
        Self { hooks: HashMap::new() }
    }

    /// Registers `extension` at `hook`, appended after any already
    /// registered there (load order is registration order).
    pub fn register(&mut self, hook: Hook, extension: Arc<dyn Extension>) {
        self.hooks.entry(hook).or_default().push(extension);
    }

    /// Fires every extension registered at `hook` in order, sequentially.
    /// A panicking/erroring extension is logged and its result omitted;
    /// extension failures never propagate into the monologue loop.
    pub async fn fire(&self, hook: Hook, payload: &HookPayload) -> Vec<HookOutcome> {
        let Some(extensions) = self.hooks.get(&hook) else {
            return Vec::new();
        };
        let mut results = Vec::with_capacity(extensions.len());
        for ext in extensions {
            match ext.run(payload).await {
                Ok(outcome) => results.push(outcome),
                Err(err) => {
                    tracing::error!(hook = ?hook, extension = ext.name(), %err, "extension error");
                }
            }
        }
        results
    }

    /// Convenience for `tool_execute_after`: true if any outcome is the
    /// `SECURITY_BLOCKED` sentinel.
    pub fn any_security_blocked(outcomes: &[HookOutcome]) -> bool {
        outcomes.iter().any(|o| matches!(o, HookOutcome::Text(t) if t == SECURITY_BLOCKED))
    }

    /// Convenience for `system_prompt`: the last returned string outcome
    /// replaces the accumulator, matching the original's "any returned
    /// string replaces the accumulator" last-wins rule.
    pub fn last_text_replacement(outcomes: &[HookOutcome]) -> Option<&str> {
        outcomes.iter().rev().find_map(|o| match o {
            HookOutcome::Text(t) => Some(t.as_str()),
            HookOutcome::None => None,
        })
    }
}

impl Default for ExtensionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingExtension {
        label: &'static str,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
        outcome: HookOutcome,
    }

    #[async_trait]
    impl Extension for RecordingExtension {
        fn name(&self) -> &str {
            self.label
        }
        async fn run(&self, _payload: &HookPayload) -> itak_types::Result<HookOutcome> {
            self.order.lock().unwrap().push(self.label);
            Ok(self.outcome.clone())
        }
    }

    #[tokio::test]
    async fn extensions_fire_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut pipeline = ExtensionPipeline::new();
        pipeline.register(Hook::MessageLoopStart, Arc::new(RecordingExtension { label: "first", order: order.clone(), outcome: HookOutcome::None }));
        pipeline.register(Hook::MessageLoopStart, Arc::new(RecordingExtension { label: "second", order: order.clone(), outcome: HookOutcome::None }));

        pipeline.fire(Hook::MessageLoopStart, &HookPayload::default()).await;
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn security_blocked_sentinel_is_detected() {
        let mut pipeline = ExtensionPipeline::new();
        pipeline.register(
            Hook::ToolExecuteAfter,
            Arc::new(RecordingExtension {
                label: "scanner",
                order: Arc::new(std::sync::Mutex::new(Vec::new())),
                outcome: HookOutcome::Text(SECURITY_BLOCKED.to_string()),
            }),
        );
        let outcomes = pipeline.fire(Hook::ToolExecuteAfter, &HookPayload::default()).await;
        assert!(ExtensionPipeline::any_security_blocked(&outcomes));
    }

    #[tokio::test]
    async fn system_prompt_last_text_wins() {
        let mut pipeline = ExtensionPipeline::new();
        pipeline.register(
            Hook::SystemPrompt,
            Arc::new(RecordingExtension { label: "a", order: Arc::new(std::sync::Mutex::new(Vec::new())), outcome: HookOutcome::Text("first override".into()) }),
        );
        pipeline.register(
            Hook::SystemPrompt,
            Arc::new(RecordingExtension { label: "b", order: Arc::new(std::sync::Mutex::new(Vec::new())), outcome: HookOutcome::Text("final override".into()) }),
        );
        let outcomes = pipeline.fire(Hook::SystemPrompt, &HookPayload::default()).await;
        assert_eq!(ExtensionPipeline::last_text_replacement(&outcomes), Some("final override"));
    }

    struct FailingExtension;

    #[async_trait]
    impl Extension for FailingExtension {
        fn name(&self) -> &str {
            "failing"
        }
        async fn run(&self, _payload: &HookPayload) -> itak_types::Result<HookOutcome> {
            Err(itak_types::ItakError::Provider { message: "boom".into() })
        }
    }

    #[tokio::test]
    async fn failing_extension_does_not_propagate() {
        let unrelated = Arc::new(AtomicUsize::new(0));
        let mut pipeline = ExtensionPipeline::new();
        pipeline.register(Hook::AgentInit, Arc::new(FailingExtension));
        let outcomes = pipeline.fire(Hook::AgentInit, &HookPayload::default()).await;
        assert!(outcomes.is_empty());
        assert_eq!(unrelated.load(Ordering::SeqCst), 0);
    }
}
