//! The double message loop: a conversation turn runs inner iterations
//! (LLM call, tool dispatch, checkpointing) until a tool sets
//! `break_loop`, the iteration cap is hit, or a critical error survives
//! one retry; a queued intervention restarts the turn in place
//! (spec.md §4.1).
//!
//! Grounded directly on `original_source/core/agent.py::monologue`,
//! `_process_tools`, and `_handle_intervention`. Rust has no exception to
//! unwind an outer `while True`/`except InterventionException: continue`,
//! so the intervention check is folded into the top of the single loop
//! instead of a nested try/except pair -- same observable behavior
//! (the queued message is appended and the turn restarts) without the
//! control-flow mechanism Rust doesn't have.

use super::extensions::{ExtensionPipeline, Hook, HookPayload, SECURITY_BLOCKED};
use crate::checkpoint::CheckpointManager;
use crate::heal::{RetryFn, SelfHealEngine};
use crate::heartbeat::HeartbeatMonitor;
use crate::logger::{EventType, Logger};
use crate::mcp::{CallOutcome, MCPClient};
use crate::ports::{ChatRequest, ModelRouterPort};
use crate::tools::{extract_tool_call, Resolution, ToolRegistry};
use itak_security::{CheckOutcome, RateLimiter};
use itak_types::context::{AgentContext, IterationState};
use itak_types::message::{History, Message};
use itak_types::ItakError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// The fixed reply returned when `iteration_count` exceeds
/// `max_iterations` (spec.md §8 scenario 6, bit-exact).
const MAX_ITERATIONS_REPLY: &str =
    "I've reached my maximum number of steps. Let me summarize what I've done so far.";

/// Mirrors `original_source/core/agent.py::AgentConfig`'s loop-shaping
/// fields; the rest of that dataclass (subsystem toggles) is threaded
/// through `MonologueEngine`'s constructor instead.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub max_iterations: u32,
    pub timeout_seconds: u64,
    pub repeat_detection: bool,
    pub checkpoint_enabled: bool,
    pub checkpoint_interval_steps: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "iTaK".to_string(),
            max_iterations: 25,
            timeout_seconds: 300,
            repeat_detection: true,
            checkpoint_enabled: true,
            checkpoint_interval_steps: 3,
        }
    }
}

/// What one inner turn decided to do next.
enum Turn {
    /// Keep looping; nothing else to report this turn.
    Continue,
    /// The turn is over; the loop should return this text to the caller.
    Done(String),
}

/// Outcome of resolving and invoking a single tool call.
enum ToolOutcome {
    /// Feed this text back to the model as a `Tool result:` message.
    Observation(String),
    /// A `break_loop` tool fired; this is the final reply.
    Break(String),
    /// A fatal (non-self-healable) error. Carries the message used for
    /// the "last retry" system note / final failure reply.
    Critical(String),
}

/// Runs the monologue loop for one conversation. Holds no per-turn
/// state itself; `AgentContext`/`History`/`IterationState` are owned by
/// the caller and threaded through `run`, so one engine instance can
/// serve many concurrent rooms.
pub struct MonologueEngine {
    config: AgentConfig,
    model_router: Arc<dyn ModelRouterPort>,
    rate_limiter: Arc<RateLimiter>,
    tools: Arc<ToolRegistry>,
    extensions: Arc<ExtensionPipeline>,
    self_heal: Arc<SelfHealEngine>,
    mcp: Option<Arc<MCPClient>>,
    checkpoint: Option<Arc<CheckpointManager>>,
    heartbeat: Option<Arc<HeartbeatMonitor>>,
    logger: Option<Arc<Logger>>,
}

impl MonologueEngine {
    pub fn new(
        config: AgentConfig,
        model_router: Arc<dyn ModelRouterPort>,
        rate_limiter: Arc<RateLimiter>,
        tools: Arc<ToolRegistry>,
        extensions: Arc<ExtensionPipeline>,
        self_heal: Arc<SelfHealEngine>,
    ) -> Self {
        Self {
            config,
            model_router,
            rate_limiter,
            tools,
            extensions,
            self_heal,
            mcp: None,
            checkpoint: None,
            heartbeat: None,
            logger: None,
        }
    }

    pub fn with_mcp(mut self, mcp: Arc<MCPClient>) -> Self {
        self.mcp = Some(mcp);
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: Arc<CheckpointManager>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Arc<HeartbeatMonitor>) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Runs the loop for `user_message`, mutating `ctx`/`history`/
    /// `iter_state` as it goes, and returns the final reply text
    /// (spec.md §4.1 "Termination").
    pub async fn run(
        &self,
        ctx: &mut AgentContext,
        history: &mut History,
        iter_state: &mut IterationState,
        user_message: &str,
    ) -> String {
        self.extensions.fire(Hook::MonologueStart, &HookPayload::default()).await;
        history.push(Message::user(user_message));

        let mut critical_retries: u32 = 0;

        loop {
            iter_state.advance();
            if let Some(hb) = &self.heartbeat {
                hb.update_activity();
            }

            if iter_state.iteration_count > self.config.max_iterations {
                tracing::warn!(
                    iterations = iter_state.iteration_count,
                    max = self.config.max_iterations,
                    "monologue hit max_iterations"
                );
                return self.finish(ctx, MAX_ITERATIONS_REPLY.to_string()).await;
            }
            if iter_state.elapsed_secs() as u64 > self.config.timeout_seconds {
                tracing::warn!(elapsed_s = iter_state.elapsed_secs(), "monologue hit timeout_seconds");
                return self.finish(ctx, MAX_ITERATIONS_REPLY.to_string()).await;
            }

            if let Some(pending) = ctx.pop_intervention() {
                history.push(Message::intervention(pending));
                continue;
            }

            if let CheckOutcome::Denied { reason } = self.rate_limiter.check("chat_model") {
                tracing::debug!(%reason, "chat_model rate limited, backing off");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }

            self.extensions.fire(Hook::MessageLoopStart, &HookPayload::default()).await;
            self.extensions
                .fire(Hook::MessageLoopPromptsBefore, &HookPayload { messages: Some(history.as_slice().to_vec()), ..Default::default() })
                .await;
            let messages = history.as_slice().to_vec();
            self.extensions
                .fire(Hook::MessageLoopPromptsAfter, &HookPayload { messages: Some(messages.clone()), ..Default::default() })
                .await;
            self.extensions.fire(Hook::BeforeMainLlmCall, &HookPayload::default()).await;

            let response = match self
                .model_router
                .chat(ChatRequest { messages: &messages }, &|_chunk: &str| {})
                .await
            {
                Ok(text) => text,
                Err(err) => {
                    match self.critical_retry(&mut critical_retries, history, err.to_string()).await {
                        Turn::Done(text) => return self.finish(ctx, text).await,
                        Turn::Continue => continue,
                    }
                }
            };
            self.rate_limiter.record("chat_model", 0.0);

            if self.config.repeat_detection
                && !response.is_empty()
                && iter_state.last_response.as_deref() == Some(response.as_str())
            {
                history.push(Message::system("WARNING: You repeated yourself. Please try a different approach."));
                continue;
            }

            history.push(Message::assistant(response.clone()));
            iter_state.last_response = Some(response.clone());
            if let Some(logger) = &self.logger {
                logger.log(
                    EventType::AgentResponse,
                    Some(&serde_json::Value::String(response.clone())),
                    &ctx.room_id,
                    &ctx.adapter_name,
                    0,
                    0.0,
                );
            }

            match self.process_tools(&response, ctx).await {
                ToolOutcome::Break(final_text) => {
                    self.extensions.fire(Hook::MonologueEnd, &HookPayload::default()).await;
                    return self.finish(ctx, final_text).await;
                }
                ToolOutcome::Observation(text) => {
                    if !text.is_empty() {
                        history.push(Message::tool(format!("Tool result:\n{text}")));
                        self.extensions
                            .fire(Hook::HistAddToolResult, &HookPayload { result: Some(text), ..Default::default() })
                            .await;
                    }
                }
                ToolOutcome::Critical(message) => {
                    match self.critical_retry(&mut critical_retries, history, message).await {
                        Turn::Done(text) => return self.finish(ctx, text).await,
                        Turn::Continue => continue,
                    }
                }
            }

            if self.config.checkpoint_enabled
                && iter_state.iteration_count % self.config.checkpoint_interval_steps.max(1) == 0
            {
                if let Some(mgr) = &self.checkpoint {
                    let last = iter_state.last_response.as_deref();
                    if let Err(err) = mgr.save(iter_state.iteration_count, &ctx.room_id, &ctx.adapter_name, history, last, serde_json::json!({})) {
                        tracing::warn!(%err, "checkpoint save failed");
                    }
                }
            }

            self.extensions.fire(Hook::MessageLoopEnd, &HookPayload::default()).await;
        }
    }

    /// Tracks the "survive one critical error" rule: the first critical
    /// error appends a warning and retries; a second in the same turn
    /// ends the loop with the error message (spec.md §4.1 step 11).
    async fn critical_retry(&self, critical_retries: &mut u32, history: &mut History, message: String) -> Turn {
        *critical_retries += 1;
        if *critical_retries > 1 {
            return Turn::Done(message);
        }
        history.push(Message::system(format!(
            "A critical error occurred: {message}\nThis is your last retry before the turn ends."
        )));
        tokio::time::sleep(Duration::from_secs(2)).await;
        Turn::Continue
    }

    async fn finish(&self, ctx: &AgentContext, text: String) -> String {
        self.extensions
            .fire(Hook::ProcessChainEnd, &HookPayload { result: Some(text.clone()), ..Default::default() })
            .await;
        if let Some(logger) = &self.logger {
            logger.log(EventType::AgentComplete, Some(&serde_json::Value::String(text.clone())), &ctx.room_id, &ctx.adapter_name, 0, 0.0);
        }
        text
    }

    /// Extracts a tool call from `response`, resolves and invokes it, and
    /// returns what the loop should do with the result (spec.md §4.3,
    /// §4.1 step 9). A response with no parseable tool call is a no-op
    /// observation: the model keeps talking until it calls a tool.
    async fn process_tools(&self, response: &str, ctx: &AgentContext) -> ToolOutcome {
        let Some(call) = extract_tool_call(response) else {
            return ToolOutcome::Observation(String::new());
        };

        if let Some(logger) = &self.logger {
            if let Some(headline) = &call.headline {
                logger.log(EventType::AgentThoughts, Some(&serde_json::Value::String(headline.clone())), &ctx.room_id, &ctx.adapter_name, 0, 0.0);
            }
        }

        if let CheckOutcome::Denied { reason } = self.rate_limiter.check(&call.tool_name) {
            return ToolOutcome::Observation(format!("Rate limited: {reason}"));
        }

        let before_outcomes = self
            .extensions
            .fire(
                Hook::ToolExecuteBefore,
                &HookPayload { tool_name: Some(call.tool_name.clone()), tool_args: Some(serde_json::to_value(&call.tool_args).unwrap_or_default()), ..Default::default() },
            )
            .await;
        if ExtensionPipeline::any_security_blocked(&before_outcomes) {
            return ToolOutcome::Observation(format!("{SECURITY_BLOCKED}: tool '{}' was blocked before execution.", call.tool_name));
        }

        let args_value = serde_json::to_value(&call.tool_args).unwrap_or(serde_json::Value::Object(Default::default()));
        let (output, is_break, execution_error) = match self.tools.resolve(&call) {
            Resolution::Mcp { qualified_name } => {
                let Some(mcp) = &self.mcp else {
                    return ToolOutcome::Observation(format!("Error: no MCP client configured for '{qualified_name}'."));
                };
                match mcp.call_tool(&qualified_name, args_value).await {
                    CallOutcome::Result(value) => (value.to_string(), false, None),
                    CallOutcome::Error(message) => (String::new(), false, Some(message)),
                }
            }
            Resolution::Local(tool) => match tool.execute(call.tool_args.clone()).await {
                Ok(result) => (result.output, result.break_loop, if result.error { Some("tool reported an error".to_string()) } else { None }),
                Err(err) => {
                    if is_recoverable(&err) {
                        (String::new(), false, Some(err.to_string()))
                    } else {
                        return ToolOutcome::Critical(err.to_string());
                    }
                }
            },
            Resolution::Unknown(tool) => {
                // spec.md §4.3 resolution rule 4: the fallback's args
                // become `{tool_name, tool_args}` so it can report what
                // the model actually tried to call.
                let mut wrapped_args = HashMap::new();
                wrapped_args.insert("tool_name".to_string(), serde_json::Value::String(call.tool_name.clone()));
                wrapped_args.insert("tool_args".to_string(), args_value.clone());
                match tool.execute(wrapped_args).await {
                    Ok(result) => (result.output, result.break_loop, if result.error { Some("tool reported an error".to_string()) } else { None }),
                    Err(err) => {
                        if is_recoverable(&err) {
                            (String::new(), false, Some(err.to_string()))
                        } else {
                            return ToolOutcome::Critical(err.to_string());
                        }
                    }
                }
            }
            Resolution::NotFound => {
                return ToolOutcome::Observation(format!("Error: no tool registered for '{}'.", call.tool_name));
            }
        };

        let mut output = output;
        if let Some(error_message) = execution_error {
            let healed = self.self_heal.heal(&error_message, "", Some(&call.tool_name), None::<&dyn RetryFn>).await;
            // A critical classification short-circuits heal() before any
            // memory/LLM call; that message ends the turn through the
            // same survive-one-retry path as a fatal dispatch error
            // (spec.md §8 scenario 5), rather than becoming an observation
            // the model could loop on.
            if healed.critical {
                return ToolOutcome::Critical(healed.message);
            }
            output = healed.message;
        }

        let after_outcomes = self
            .extensions
            .fire(
                Hook::ToolExecuteAfter,
                &HookPayload { tool_name: Some(call.tool_name.clone()), result: Some(output.clone()), ..Default::default() },
            )
            .await;
        if ExtensionPipeline::any_security_blocked(&after_outcomes) {
            return ToolOutcome::Observation(format!("{SECURITY_BLOCKED}: tool '{}' result was blocked.", call.tool_name));
        }

        let output = crate::tools::registry::wrap_if_untrusted(&call.tool_name, output);
        self.rate_limiter.record(&call.tool_name, 0.0);
        if let Some(logger) = &self.logger {
            logger.log(EventType::ToolExecution, Some(&serde_json::Value::String(call.tool_name.clone())), &ctx.room_id, &ctx.adapter_name, 0, 0.0);
        }

        if is_break {
            ToolOutcome::Break(output)
        } else {
            ToolOutcome::Observation(output)
        }
    }
}

/// Whether `SelfHealEngine` is allowed to act on this error, per
/// `itak_types::error::ItakError`'s recoverable/fatal split. Fatal
/// variants are the monologue-level "critical" errors this engine
/// survives once before giving up (spec.md §4.1 step 11), distinct from
/// `SelfHealEngine::heal`'s own `security`/`data` critical short-circuit.
fn is_recoverable(err: &ItakError) -> bool {
    matches!(err, ItakError::Retry { .. } | ItakError::Timeout { .. } | ItakError::Provider { .. } | ItakError::RateLimited { .. })
}
