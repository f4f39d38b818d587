//! Error classification and self-heal attempt records (spec.md §3, §4.4).
//!
//! Grounded on `original_source/core/self_heal.py`'s `ErrorCategory`,
//! `ErrorSeverity`, `ClassifiedError`, and `HealAttempt` dataclasses.

use serde::{Deserialize, Serialize};

/// The kind of failure an error represents, used to pick a pattern-specific
/// fix strategy and to decide whether the error can be self-healed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Dependency,
    Network,
    Config,
    Runtime,
    Tool,
    Resource,
    Security,
    Data,
    Unknown,
}

impl ErrorCategory {
    /// `security` and `data` are always critical and never self-healed
    /// (spec.md §3 "ClassifiedError").
    pub fn is_always_critical(self) -> bool {
        matches!(self, ErrorCategory::Security | ErrorCategory::Data)
    }
}

/// How severe a classified error is, and therefore what recovery path
/// applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Repairable,
    Partial,
    Critical,
}

/// An error as classified by `SelfHealEngine::classify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub message: String,
    pub traceback_str: String,
    pub tool_name: Option<String>,
    pub tool_args: Option<serde_json::Value>,
    pub timestamp: i64,
}

/// Where a healing fix came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealSource {
    Memory,
    Llm,
    Web,
}

/// A single attempt made by `SelfHealEngine::heal` to recover from a
/// classified error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealAttempt {
    pub fix_description: String,
    pub source: HealSource,
    pub success: bool,
    pub error_on_retry: Option<String>,
    pub duration_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_and_data_are_always_critical() {
        assert!(ErrorCategory::Security.is_always_critical());
        assert!(ErrorCategory::Data.is_always_critical());
        assert!(!ErrorCategory::Network.is_always_critical());
    }
}
