//! Rate-limiter category and bucket types (spec.md §3, §4.5).
//!
//! Grounded on `original_source/security/rate_limiter.py`'s category set and
//! on `clawft-core::pipeline::rate_limiter::SlidingWindow`'s Rust shape.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// The built-in rate-limit categories named in spec.md §4.5. Any per-tool
/// category the engine records (e.g. a tool name) is represented as
/// `Category::Other(String)`.
///
/// This type is an internal bucket key, not a wire type: it is never
/// serialized directly, so it derives no `serde` impl. Config maps from
/// category name to [`RateLimit`] use a plain `String` key instead, and are
/// resolved to a `RateCategory` at lookup time via [`RateCategory::as_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateCategory {
    Global,
    ChatModel,
    UtilityModel,
    BrowserModel,
    CodeExecution,
    WebSearch,
    BrowserAgent,
    Other(String),
}

impl RateCategory {
    pub fn as_key(&self) -> &str {
        match self {
            RateCategory::Global => "global",
            RateCategory::ChatModel => "chat_model",
            RateCategory::UtilityModel => "utility_model",
            RateCategory::BrowserModel => "browser_model",
            RateCategory::CodeExecution => "code_execution",
            RateCategory::WebSearch => "web_search",
            RateCategory::BrowserAgent => "browser_agent",
            RateCategory::Other(name) => name.as_str(),
        }
    }
}

impl std::fmt::Display for RateCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Per-category rolling window: an ordered sequence of request timestamps,
/// retained only for the last hour (spec.md §3 "RateBucket").
#[derive(Debug, Default)]
pub struct RateBucket {
    pub timestamps: Vec<Instant>,
}

/// Per-category limit configuration (spec.md §4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimit {
    pub max_per_minute: u32,
    #[serde(default)]
    pub max_per_hour: Option<u32>,
}

/// Per-client bucket for auth-failure lockout (spec.md §3 "AuthFailureBucket",
/// §4.5 "Auth-failure lockout"). Retained only for the lockout window.
#[derive(Debug, Default)]
pub struct AuthFailureBucket {
    pub timestamps: Vec<Instant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_key_matches_spec_names() {
        assert_eq!(RateCategory::ChatModel.as_key(), "chat_model");
        assert_eq!(RateCategory::WebSearch.as_key(), "web_search");
        assert_eq!(RateCategory::Other("my_tool".into()).as_key(), "my_tool");
    }
}
