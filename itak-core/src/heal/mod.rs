//! 5-step self-healing pipeline (spec.md §4.4).
//!
//! Grounded directly on `original_source/core/self_heal.py`: ordered
//! regex classification, critical short-circuit, session retry budget,
//! a memory probe, and LLM-reasoned fixes tried with fixed backoff,
//! learning from whichever attempt succeeds.

mod patterns;

pub use patterns::classify_text;

use crate::ports::{MemoryPort, ModelRouterPort};
use itak_types::heal::{ClassifiedError, ErrorCategory, ErrorSeverity, HealAttempt, HealSource};
use itak_types::message::Message;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_PER_SESSION: u32 = 10;
const BACKOFF_SECONDS: [u64; 3] = [1, 5, 15];

/// Outcome of one `SelfHealEngine::heal` invocation.
pub struct HealOutcome {
    pub healed: bool,
    pub message: String,
    pub attempts: Vec<HealAttempt>,
    /// `true` only when `classify` found the error immediately critical
    /// (spec.md §8 "Critical non-healing"): no memory or LLM call was
    /// made, and the caller should end the turn rather than treat
    /// `message` as a retryable observation.
    pub critical: bool,
}

/// An async retry of the failed operation, supplied by the caller. Its
/// success both confirms the fix and (for LLM-sourced fixes) triggers
/// `learn`.
#[async_trait::async_trait]
pub trait RetryFn: Send + Sync {
    async fn retry(&self) -> Result<(), String>;
}

pub struct SelfHealEngine {
    memory: Option<Arc<dyn MemoryPort>>,
    model_router: Option<Arc<dyn ModelRouterPort>>,
    session_retries: Mutex<u32>,
    error_log: Mutex<Vec<ClassifiedError>>,
}

impl SelfHealEngine {
    pub fn new(memory: Option<Arc<dyn MemoryPort>>, model_router: Option<Arc<dyn ModelRouterPort>>) -> Self {
        Self {
            memory,
            model_router,
            session_retries: Mutex::new(0),
            error_log: Mutex::new(Vec::new()),
        }
    }

    /// Resets the per-session retry budget; call at the start of a new
    /// conversation (spec.md §4.4 matches the original's `reset_session`).
    pub fn reset_session(&self) {
        *self.session_retries.lock() = 0;
        self.error_log.lock().clear();
    }

    /// Step 1: classify an error's message/traceback into a category and
    /// severity. `security`/`data` categories are always critical.
    pub fn classify(&self, message: &str, traceback_str: &str, tool_name: Option<&str>) -> ClassifiedError {
        let full_text = format!("{message}\n{traceback_str}");
        let category = classify_text(&full_text);
        let severity = if category.is_always_critical() {
            ErrorSeverity::Critical
        } else {
            ErrorSeverity::Repairable
        };
        let classified = ClassifiedError {
            category,
            severity,
            message: message.to_string(),
            traceback_str: traceback_str.to_string(),
            tool_name: tool_name.map(str::to_string),
            tool_args: None,
            timestamp: chrono::Utc::now().timestamp(),
        };
        self.error_log.lock().push(classified.clone());
        classified
    }

    async fn check_memory(&self, classified: &ClassifiedError) -> Option<String> {
        let memory = self.memory.as_ref()?;
        let query = format!("{} error: {}", classified.category.as_str(), classified.message);
        let hits = memory.search(&query, 3).await.ok()?;
        hits.into_iter().next().map(|hit| hit.content)
    }

    async fn reason_fixes(&self, classified: &ClassifiedError) -> Vec<String> {
        let Some(router) = &self.model_router else {
            return Vec::new();
        };
        let tail: String = classified
            .traceback_str
            .lines()
            .rev()
            .take(20)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "An error occurred during tool execution.\n\n\
             Tool: {}\n\
             Category: {}\n\
             Error: {}\n\n\
             Traceback (last 20 lines):\n{tail}\n\n\
             Suggest exactly 3 possible fixes, ranked from most to least likely. \
             For each fix, provide a single actionable sentence. \
             Format: one fix per line, numbered 1-3.",
            classified.tool_name.as_deref().unwrap_or(""),
            classified.category.as_str(),
            classified.message,
        );

        let Ok(response) = router.complete(&prompt).await else {
            return Vec::new();
        };
        response
            .lines()
            .map(str::trim)
            .filter(|line| line.chars().next().is_some_and(|c| c.is_ascii_digit()))
            .take(3)
            .map(str::to_string)
            .collect()
    }

    async fn learn(&self, classified: &ClassifiedError, fix: &str) {
        let Some(memory) = &self.memory else { return };
        let entry = format!(
            "## Self-Healed Error\n**Category:** {}\n**Error:** {}\n**Fix:** {}\n**Tool:** {}\n",
            classified.category.as_str(),
            classified.message,
            fix,
            classified.tool_name.as_deref().unwrap_or(""),
        );
        let _ = memory.save("errors", &entry).await;
    }

    /// Runs the full pipeline. `retry_fn` is optional: without it, a
    /// memory hit or LLM fix is recorded but never confirmed as healed
    /// (there is nothing to retry), matching the original's behavior when
    /// no `retry_fn` is supplied.
    pub async fn heal(
        &self,
        message: &str,
        traceback_str: &str,
        tool_name: Option<&str>,
        retry_fn: Option<&(dyn RetryFn)>,
    ) -> HealOutcome {
        let classified = self.classify(message, traceback_str, tool_name);
        let mut attempts = Vec::new();

        if classified.severity == ErrorSeverity::Critical {
            tracing::error!(category = ?classified.category, %message, "critical error, not self-healable");
            return HealOutcome {
                healed: false,
                message: format!("\u{1f6ab} Critical error: {}", classified.message),
                attempts,
                critical: true,
            };
        }

        if *self.session_retries.lock() >= MAX_PER_SESSION {
            return HealOutcome {
                healed: false,
                message: "\u{26a0}\u{fe0f} Self-heal session budget exhausted (10/10).".to_string(),
                attempts,
                critical: false,
            };
        }

        tracing::info!(category = ?classified.category, %message, "self-heal started");

        if let Some(memory_fix) = self.check_memory(&classified).await {
            let started = Instant::now();
            *self.session_retries.lock() += 1;
            if let Some(retry) = retry_fn {
                match retry.retry().await {
                    Ok(()) => {
                        attempts.push(HealAttempt {
                            fix_description: memory_fix.clone(),
                            source: HealSource::Memory,
                            success: true,
                            error_on_retry: None,
                            duration_seconds: started.elapsed().as_secs_f64(),
                        });
                        let preview: String = memory_fix.chars().take(80).collect();
                        tracing::info!(fix = %preview, "self-healed from memory");
                        return HealOutcome {
                            healed: true,
                            message: format!("\u{2705} Self-healed (from memory): {preview}"),
                            attempts,
                            critical: false,
                        };
                    }
                    Err(err) => {
                        attempts.push(HealAttempt {
                            fix_description: memory_fix,
                            source: HealSource::Memory,
                            success: false,
                            error_on_retry: Some(err),
                            duration_seconds: started.elapsed().as_secs_f64(),
                        });
                    }
                }
            } else {
                attempts.push(HealAttempt {
                    fix_description: memory_fix,
                    source: HealSource::Memory,
                    success: false,
                    error_on_retry: None,
                    duration_seconds: started.elapsed().as_secs_f64(),
                });
            }
        }

        let fixes = self.reason_fixes(&classified).await;
        for (i, fix) in fixes.iter().enumerate() {
            if *self.session_retries.lock() >= MAX_PER_SESSION {
                break;
            }
            *self.session_retries.lock() += 1;
            let backoff = BACKOFF_SECONDS[i.min(BACKOFF_SECONDS.len() - 1)];
            tokio::time::sleep(Duration::from_secs(backoff)).await;

            let started = Instant::now();
            if let Some(retry) = retry_fn {
                match retry.retry().await {
                    Ok(()) => {
                        self.learn(&classified, fix).await;
                        attempts.push(HealAttempt {
                            fix_description: fix.clone(),
                            source: HealSource::Llm,
                            success: true,
                            error_on_retry: None,
                            duration_seconds: started.elapsed().as_secs_f64(),
                        });
                        let preview: String = fix.chars().take(80).collect();
                        tracing::info!(fix_number = i + 1, fix = %preview, "self-healed via llm fix");
                        return HealOutcome {
                            healed: true,
                            message: format!("\u{2705} Self-healed (fix #{}): {preview}", i + 1),
                            attempts,
                            critical: false,
                        };
                    }
                    Err(err) => {
                        attempts.push(HealAttempt {
                            fix_description: fix.clone(),
                            source: HealSource::Llm,
                            success: false,
                            error_on_retry: Some(err),
                            duration_seconds: started.elapsed().as_secs_f64(),
                        });
                    }
                }
            } else {
                attempts.push(HealAttempt {
                    fix_description: fix.clone(),
                    source: HealSource::Llm,
                    success: false,
                    error_on_retry: None,
                    duration_seconds: started.elapsed().as_secs_f64(),
                });
            }
        }

        tracing::error!(attempts = attempts.len(), %message, "self-heal failed");
        HealOutcome {
            healed: false,
            message: format!(
                "\u{26a0}\u{fe0f} Self-heal failed after {} attempts.\nError: {}\nCategory: {}",
                attempts.len(),
                classified.message,
                classified.category.as_str(),
            ),
            attempts,
            critical: false,
        }
    }

    pub fn session_retries(&self) -> u32 {
        *self.session_retries.lock()
    }
}

impl ErrorCategory {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Dependency => "dependency",
            ErrorCategory::Network => "network",
            ErrorCategory::Config => "config",
            ErrorCategory::Runtime => "runtime",
            ErrorCategory::Tool => "tool",
            ErrorCategory::Resource => "resource",
            ErrorCategory::Security => "security",
            ErrorCategory::Data => "data",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

/// Unused in the engine itself but kept so callers building history
/// entries for a failed heal can reuse the same `[system]`-role framing
/// as the monologue engine.
pub fn system_note(text: impl Into<String>) -> Message {
    Message::system(text)
}
