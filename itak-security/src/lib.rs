//! # itak-security
//!
//! Security-adjacent subsystems for the iTaK agent kernel: the output guard
//! (PII/secret redaction), the secret manager (two-store resolution), and
//! the rate limiter (token buckets + daily budget + auth lockout).
//!
//! Depends only on `itak-types`; everything here is synchronous and holds
//! no references to the async engine in `itak-core`.

pub mod output_guard;
pub mod patterns;
pub mod rate_limiter;
pub mod secret_manager;

pub use output_guard::{GuardResult, OutputGuard, OutputGuardConfig, Redaction};
pub use patterns::PIICategory;
pub use rate_limiter::{CategoryLimit, CheckOutcome, RateLimiter};
pub use secret_manager::{mask_value, SecretManager};

/// The minimal interface `SecretManager::register_with_logger` needs from
/// `itak_core::logger::Logger`. Kept here (rather than importing
/// `itak-core`, which would create a dependency cycle) as a narrow port the
/// logger implements.
pub trait LoggerSecretSink {
    fn register_secret(&mut self, secret: &str);
}
