//! Per-category token-bucket rate limiter with a daily cost budget and
//! auth-failure lockout (spec.md §4.5).
//!
//! Grounded on `original_source/security/rate_limiter.py` for the exact
//! category/budget/lockout semantics, and on
//! `clawft-core::pipeline::rate_limiter::RateLimiter` for the Rust
//! concurrency shape (`RwLock<HashMap<_, _>>` + atomic counters).

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

const WINDOW_HOUR: Duration = Duration::from_secs(3600);
const WINDOW_MINUTE: Duration = Duration::from_secs(60);
const DAILY_RESET: Duration = Duration::from_secs(86400);
const AUTH_LOCKOUT_ATTEMPTS: usize = 5;
const AUTH_LOCKOUT_WINDOW: Duration = Duration::from_secs(900);

/// Per-category limit configuration.
#[derive(Debug, Clone, Copy)]
pub struct CategoryLimit {
    pub max_per_minute: u32,
    pub max_per_hour: Option<u32>,
}

impl CategoryLimit {
    pub const fn per_minute(max_per_minute: u32) -> Self {
        Self { max_per_minute, max_per_hour: None }
    }
}

#[derive(Default)]
struct Bucket {
    timestamps: VecDeque<Instant>,
}

impl Bucket {
    fn evict_older_than(&mut self, cutoff: Instant) {
        while let Some(front) = self.timestamps.front() {
            if *front < cutoff {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn count_since(&self, cutoff: Instant) -> usize {
        self.timestamps.iter().filter(|t| **t >= cutoff).count()
    }
}

struct Inner {
    limits: HashMap<String, CategoryLimit>,
    buckets: HashMap<String, Bucket>,
    daily_budget_usd: f64,
    daily_cost_usd: f64,
    cost_reset_at: Instant,
    auth_failures: HashMap<String, Bucket>,
}

/// The rate limiter: one instance shared across all conversations. Every
/// method is internally locked, so callers never need an external mutex.
pub struct RateLimiter {
    inner: RwLock<Inner>,
}

/// The outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Allowed,
    Denied { reason: String },
}

impl CheckOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CheckOutcome::Allowed)
    }
}

impl RateLimiter {
    /// Default category limits, matching
    /// `original_source/security/rate_limiter.py`'s built-in defaults.
    pub fn with_default_limits(daily_budget_usd: f64) -> Self {
        let mut limits = HashMap::new();
        limits.insert(
            "global".to_string(),
            CategoryLimit { max_per_minute: 120, max_per_hour: Some(3600) },
        );
        limits.insert("chat_model".to_string(), CategoryLimit::per_minute(30));
        limits.insert("utility_model".to_string(), CategoryLimit::per_minute(60));
        limits.insert("browser_model".to_string(), CategoryLimit::per_minute(20));
        limits.insert("code_execution".to_string(), CategoryLimit::per_minute(30));
        limits.insert("web_search".to_string(), CategoryLimit::per_minute(20));
        limits.insert("browser_agent".to_string(), CategoryLimit::per_minute(10));

        Self {
            inner: RwLock::new(Inner {
                limits,
                buckets: HashMap::new(),
                daily_budget_usd,
                daily_cost_usd: 0.0,
                cost_reset_at: Instant::now(),
                auth_failures: HashMap::new(),
            }),
        }
    }

    pub fn set_limit(&self, category: &str, max_per_minute: Option<u32>, max_per_hour: Option<u32>) {
        let mut inner = self.inner.write();
        let entry = inner.limits.entry(category.to_string()).or_insert(CategoryLimit {
            max_per_minute: 120,
            max_per_hour: None,
        });
        if let Some(mpm) = max_per_minute {
            entry.max_per_minute = mpm;
        }
        if max_per_hour.is_some() {
            entry.max_per_hour = max_per_hour;
        }
    }

    /// Checks whether a request in `category` is currently allowed
    /// (spec.md §4.5 `Check`). Recurses into `"global"` unless already
    /// checking it, matching the original's fan-out.
    pub fn check(&self, category: &str) -> CheckOutcome {
        let now = Instant::now();
        let mut inner = self.inner.write();

        if now.duration_since(inner.cost_reset_at) > DAILY_RESET {
            inner.daily_cost_usd = 0.0;
            inner.cost_reset_at = now;
        }
        if inner.daily_cost_usd >= inner.daily_budget_usd {
            return CheckOutcome::Denied {
                reason: format!(
                    "Daily budget exhausted (${:.2}/${:.2})",
                    inner.daily_cost_usd, inner.daily_budget_usd
                ),
            };
        }

        let limit = inner
            .limits
            .get(category)
            .copied()
            .or_else(|| inner.limits.get("global").copied())
            .unwrap_or(CategoryLimit::per_minute(120));

        let bucket = inner.buckets.entry(category.to_string()).or_default();
        bucket.evict_older_than(now - WINDOW_HOUR);

        let minute_cutoff = now - WINDOW_MINUTE;
        let recent_minute = bucket.count_since(minute_cutoff);
        if recent_minute as u32 >= limit.max_per_minute {
            if let Some(oldest) = bucket.timestamps.iter().find(|t| **t >= minute_cutoff) {
                let wait = WINDOW_MINUTE.saturating_sub(now.duration_since(*oldest));
                return CheckOutcome::Denied {
                    reason: format!(
                        "Rate limit ({category}): {recent_minute}/{} per minute. Wait {}s.",
                        limit.max_per_minute,
                        wait.as_secs()
                    ),
                };
            }
        }

        if let Some(max_hour) = limit.max_per_hour {
            let recent_hour = bucket.timestamps.len();
            if recent_hour as u32 >= max_hour {
                return CheckOutcome::Denied {
                    reason: format!("Rate limit ({category}): {recent_hour}/{max_hour} per hour."),
                };
            }
        }

        drop(inner);
        if category != "global" {
            return self.check("global");
        }
        CheckOutcome::Allowed
    }

    /// Records a request against `category` and against `"global"`, and
    /// accrues `cost_usd` toward the daily budget (spec.md §4.5 `Record`,
    /// SPEC_FULL.md §C.4).
    pub fn record(&self, category: &str, cost_usd: f64) {
        let now = Instant::now();
        let mut inner = self.inner.write();
        inner.buckets.entry(category.to_string()).or_default().timestamps.push_back(now);
        if category != "global" {
            inner.buckets.entry("global".to_string()).or_default().timestamps.push_back(now);
        }
        inner.daily_cost_usd += cost_usd;
    }

    pub fn budget_remaining(&self) -> f64 {
        let inner = self.inner.read();
        inner.daily_budget_usd - inner.daily_cost_usd
    }

    // ── Auth-failure lockout ──────────────────────────────────────────

    pub fn record_auth_failure(&self, client_id: &str) {
        let now = Instant::now();
        let mut inner = self.inner.write();
        let bucket = inner.auth_failures.entry(client_id.to_string()).or_default();
        bucket.timestamps.push_back(now);
        bucket.evict_older_than(now - AUTH_LOCKOUT_WINDOW);
        if bucket.timestamps.len() >= AUTH_LOCKOUT_ATTEMPTS {
            tracing::warn!(
                client_id,
                failures = bucket.timestamps.len(),
                locked_for_s = AUTH_LOCKOUT_WINDOW.as_secs(),
                "auth lockout triggered"
            );
        }
    }

    /// Returns `(locked, retry_after_seconds)`.
    pub fn check_auth_lockout(&self, client_id: &str) -> (bool, u64) {
        let now = Instant::now();
        let mut inner = self.inner.write();
        let Some(bucket) = inner.auth_failures.get_mut(client_id) else {
            return (false, 0);
        };
        bucket.evict_older_than(now - AUTH_LOCKOUT_WINDOW);
        if bucket.timestamps.len() >= AUTH_LOCKOUT_ATTEMPTS {
            let oldest = *bucket.timestamps.front().expect("non-empty checked above");
            let elapsed = now.duration_since(oldest);
            let retry_after = AUTH_LOCKOUT_WINDOW.saturating_sub(elapsed).as_secs().max(1);
            return (true, retry_after);
        }
        (false, 0)
    }

    pub fn record_auth_success(&self, client_id: &str) {
        self.inner.write().auth_failures.remove(client_id);
    }
}
