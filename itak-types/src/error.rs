//! Error types for the iTaK agent kernel.
//!
//! Provides [`ItakError`] as the top-level error type and [`ToolError`] for
//! tool-dispatch failures. Both are non-exhaustive to allow future extension
//! without breaking downstream.

use thiserror::Error;

/// Top-level error type for the iTaK agent kernel.
///
/// Variants are grouped into recoverable (retry, timeout, rate-limit) and
/// fatal (config, security, I/O) categories. Recoverable variants are the
/// ones `SelfHealEngine` is allowed to act on; fatal variants bypass
/// self-healing entirely (see `itak_core::heal`).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ItakError {
    // ── Recoverable ──────────────────────────────────────────────────

    /// A transient failure that may succeed on retry.
    #[error("retry required: {source} (attempt {attempts})")]
    Retry {
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        /// How many attempts have been made so far.
        attempts: u32,
    },

    /// An operation exceeded its deadline.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Human-readable name of the operation that timed out.
        operation: String,
    },

    /// The model provider returned an error.
    #[error("provider error: {message}")]
    Provider {
        /// Provider-supplied error message.
        message: String,
    },

    /// A rate limit or cost ceiling was hit.
    #[error("rate limited: {reason}")]
    RateLimited {
        /// Why the request was denied.
        reason: String,
        /// Suggested wait time in milliseconds before retrying, if known.
        retry_after_ms: Option<u64>,
    },

    // ── Fatal ────────────────────────────────────────────────────────

    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A communication channel (MCP stdio pipe, broadcast bus) closed
    /// unexpectedly.
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// A security boundary was violated: unauthorized access, a leaked
    /// credential, or a `SECURITY_BLOCKED` sentinel from an extension hook.
    /// Always classified as critical; never self-healed.
    #[error("security violation: {reason}")]
    SecurityViolation {
        /// What policy was violated.
        reason: String,
    },

    /// Data integrity was violated: corruption, a checksum mismatch, a
    /// failed invariant in a persisted store. Always classified as
    /// critical; never self-healed.
    #[error("data integrity violation: {reason}")]
    DataIntegrity {
        /// What was found to be inconsistent.
        reason: String,
    },
}

/// Errors produced by tool resolution and invocation (spec.md §4.3).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ToolError {
    /// No tool, MCP or local, matched the requested name.
    #[error("tool '{0}' not found")]
    NotFound(String),

    /// The tool's argument map failed validation.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// The tool ran but failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The caller lacks the permission level the tool requires.
    #[error("permission denied for tool '{tool}': {reason}")]
    PermissionDenied {
        /// The tool that was denied.
        tool: String,
        /// Why it was denied.
        reason: String,
    },

    /// The tool exceeded its execution deadline.
    #[error("tool timed out after {0}s")]
    Timeout(u64),
}

impl From<ToolError> for ItakError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::PermissionDenied { tool, reason } => ItakError::SecurityViolation {
                reason: format!("tool '{tool}' permission denied: {reason}"),
            },
            ToolError::Timeout(secs) => ItakError::Timeout {
                operation: format!("tool execution ({secs}s budget)"),
            },
            other => ItakError::Retry {
                source: Box::new(other),
                attempts: 0,
            },
        }
    }
}

/// A convenience alias used throughout the `itak-*` crates.
pub type Result<T> = std::result::Result<T, ItakError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn itak_error_display() {
        let err = ItakError::Timeout {
            operation: "llm_call".into(),
        };
        assert_eq!(err.to_string(), "operation timed out: llm_call");
    }

    #[test]
    fn itak_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ItakError = io_err.into();
        assert!(matches!(err, ItakError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn itak_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{bad}}").unwrap_err();
        let err: ItakError = json_err.into();
        assert!(matches!(err, ItakError::Json(_)));
    }

    #[test]
    fn tool_error_not_found_display() {
        let err = ToolError::NotFound("grep".into());
        assert_eq!(err.to_string(), "tool 'grep' not found");
    }

    #[test]
    fn tool_error_permission_denied_becomes_security_violation() {
        let err: ItakError = ToolError::PermissionDenied {
            tool: "shell".into(),
            reason: "requires level 3".into(),
        }
        .into();
        assert!(matches!(err, ItakError::SecurityViolation { .. }));
    }

    #[test]
    fn tool_error_timeout_becomes_timeout() {
        let err: ItakError = ToolError::Timeout(60).into();
        assert!(matches!(err, ItakError::Timeout { .. }));
    }

    #[test]
    fn security_violation_display() {
        let err = ItakError::SecurityViolation {
            reason: "path traversal detected".into(),
        };
        assert_eq!(err.to_string(), "security violation: path traversal detected");
    }

    #[test]
    fn result_alias_works() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        fn err_fn() -> Result<i32> {
            Err(ItakError::Provider {
                message: "boom".into(),
            })
        }
        assert_eq!(ok_fn().unwrap(), 42);
        assert!(err_fn().is_err());
    }
}
