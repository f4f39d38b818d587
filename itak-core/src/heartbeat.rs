//! Periodic liveness and subsystem health monitoring (spec.md §4.10).
//!
//! Grounded directly on `original_source/heartbeat/monitor.py`: stall
//! detection with activity-reset-to-prevent-flood, a bounded 100-entry
//! health ring, and reconnect gating. Per SPEC_FULL.md §C.6, memory-backend
//! reconnection goes through a single `MemoryPort::health`/`reconnect` pair
//! rather than the original's per-backend (`neo4j`/`weaviate`) branching,
//! since those backends are out of scope here.

use crate::ports::MemoryPort;
use itak_security::RateLimiter;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const HEALTH_HISTORY_LIMIT: usize = 100;

/// One point-in-time health snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRecord {
    pub agent_alive: bool,
    pub last_activity_ago_s: f64,
    pub memory_healthy: bool,
    pub memory_detail: String,
    pub budget_ok: bool,
    pub budget_remaining: f64,
}

type AlertCallback = Box<dyn Fn(&str) + Send + Sync>;

struct SharedState {
    last_activity: AtomicU64, // seconds since an arbitrary epoch (Instant-relative)
    last_reconnect_attempt: AtomicU64,
    history: Mutex<VecDeque<HealthRecord>>,
    alert_callbacks: Mutex<Vec<AlertCallback>>,
    running: AtomicBool,
}

/// Monitors `MonologueEngine` liveness and memory-backend connectivity,
/// triggers emergency checkpoints on stall, and periodically retries
/// reconnects.
pub struct HeartbeatMonitor {
    interval: Duration,
    stall_timeout: Duration,
    reconnect_interval: Duration,
    start: Instant,
    state: Arc<SharedState>,
    memory: Arc<dyn MemoryPort>,
    rate_limiter: Arc<RateLimiter>,
}

impl HeartbeatMonitor {
    pub fn new(
        memory: Arc<dyn MemoryPort>,
        rate_limiter: Arc<RateLimiter>,
        interval: Duration,
        stall_timeout: Duration,
        reconnect_interval: Duration,
    ) -> Self {
        let start = Instant::now();
        Self {
            interval,
            stall_timeout,
            reconnect_interval,
            start,
            state: Arc::new(SharedState {
                last_activity: AtomicU64::new(0),
                last_reconnect_attempt: AtomicU64::new(0),
                history: Mutex::new(VecDeque::new()),
                alert_callbacks: Mutex::new(Vec::new()),
                running: AtomicBool::new(false),
            }),
            memory,
            rate_limiter,
        }
    }

    fn elapsed_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    /// Called by `MonologueEngine` on every iteration to signal liveness.
    pub fn update_activity(&self) {
        self.state.last_activity.store(self.elapsed_secs(), Ordering::Relaxed);
    }

    pub fn register_alert(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        self.state.alert_callbacks.lock().push(Box::new(callback));
    }

    /// Spawns the monitoring loop as a background task, returning a handle
    /// that cancels it on drop-of-token.
    pub fn spawn(self: &Arc<Self>, checkpoint_save: impl Fn() + Send + Sync + 'static, cancel: CancellationToken) {
        self.state.running.store(true, Ordering::SeqCst);
        let this = self.clone();
        let checkpoint_save = Arc::new(checkpoint_save);
        tokio::spawn(async move {
            tracing::info!(
                interval_s = this.interval.as_secs(),
                stall_timeout_s = this.stall_timeout.as_secs(),
                "heartbeat started"
            );
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(this.interval) => {}
                }
                if !this.state.running.load(Ordering::SeqCst) {
                    break;
                }
                let health = this.check_health().await;
                {
                    let mut hist = this.state.history.lock();
                    hist.push_back(health.clone());
                    while hist.len() > HEALTH_HISTORY_LIMIT {
                        hist.pop_front();
                    }
                }
                if !health.agent_alive {
                    this.handle_stall(checkpoint_save.as_ref()).await;
                }
                if !health.memory_healthy {
                    this.handle_memory_issues().await;
                }
            }
        });
    }

    pub fn stop(&self) {
        self.state.running.store(false, Ordering::SeqCst);
    }

    pub async fn check_health(&self) -> HealthRecord {
        let now = self.elapsed_secs();
        let last_activity = self.state.last_activity.load(Ordering::Relaxed);
        let since_activity = now.saturating_sub(last_activity);
        let agent_alive = since_activity < self.stall_timeout.as_secs();

        let memory = self.memory.health().await;
        let budget_remaining = self.rate_limiter.budget_remaining();

        HealthRecord {
            agent_alive,
            last_activity_ago_s: since_activity as f64,
            memory_healthy: memory.healthy,
            memory_detail: memory.detail,
            budget_ok: budget_remaining > 0.0,
            budget_remaining,
        }
    }

    async fn handle_stall(&self, checkpoint_save: &(dyn Fn() + Send + Sync)) {
        tracing::warn!("agent stall detected, attempting recovery");
        checkpoint_save();
        self.send_alert(&format!(
            "\u{26a0}\u{fe0f} Agent Stall Detected: no activity for {}s. Attempting recovery...",
            self.stall_timeout.as_secs()
        ));
        // Reset activity so the next tick doesn't alert again immediately.
        self.state.last_activity.store(self.elapsed_secs(), Ordering::Relaxed);
    }

    async fn handle_memory_issues(&self) {
        let now = self.elapsed_secs();
        let last_attempt = self.state.last_reconnect_attempt.load(Ordering::Relaxed);
        if now.saturating_sub(last_attempt) < self.reconnect_interval.as_secs() {
            return;
        }
        self.state.last_reconnect_attempt.store(now, Ordering::Relaxed);
        if let Err(err) = self.memory.reconnect().await {
            tracing::warn!(%err, "memory backend reconnect failed");
        } else {
            tracing::info!("memory backend reconnected");
        }
    }

    fn send_alert(&self, message: &str) {
        for cb in self.state.alert_callbacks.lock().iter() {
            cb(message);
        }
    }

    pub fn history(&self, limit: usize) -> Vec<HealthRecord> {
        let hist = self.state.history.lock();
        hist.iter().rev().take(limit).rev().cloned().collect()
    }

    /// Fraction of recorded health checks where the agent was alive.
    pub fn uptime_pct(&self) -> f64 {
        let hist = self.state.history.lock();
        if hist.is_empty() {
            return 100.0;
        }
        let alive = hist.iter().filter(|h| h.agent_alive).count();
        (alive as f64 / hist.len() as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MemoryHealth;
    use async_trait::async_trait;
    use itak_types::Result;
    use std::sync::atomic::AtomicUsize;

    struct FakeMemory {
        healthy: bool,
    }

    #[async_trait]
    impl MemoryPort for FakeMemory {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<crate::ports::MemoryHit>> {
            Ok(vec![])
        }
        async fn save(&self, _category: &str, _content: &str) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _content: &str) -> Result<()> {
            Ok(())
        }
        async fn health(&self) -> MemoryHealth {
            MemoryHealth { healthy: self.healthy, detail: "fake".into() }
        }
        async fn reconnect(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn fresh_activity_reports_alive() {
        let memory = Arc::new(FakeMemory { healthy: true });
        let limiter = Arc::new(RateLimiter::with_default_limits(5.0));
        let monitor = HeartbeatMonitor::new(memory, limiter, Duration::from_secs(30), Duration::from_secs(120), Duration::from_secs(300));
        monitor.update_activity();
        let health = monitor.check_health().await;
        assert!(health.agent_alive);
        assert!(health.memory_healthy);
        assert!(health.budget_ok);
    }

    #[tokio::test]
    async fn stall_triggers_checkpoint_and_alert() {
        let memory = Arc::new(FakeMemory { healthy: true });
        let limiter = Arc::new(RateLimiter::with_default_limits(5.0));
        let monitor = Arc::new(HeartbeatMonitor::new(
            memory,
            limiter,
            Duration::from_millis(10),
            Duration::from_secs(0), // stall_timeout 0 => immediately stale
            Duration::from_secs(300),
        ));

        let checkpoint_calls = Arc::new(AtomicUsize::new(0));
        let cc = checkpoint_calls.clone();
        let alerts = Arc::new(Mutex::new(Vec::new()));
        let a = alerts.clone();
        monitor.register_alert(move |msg| a.lock().push(msg.to_string()));

        monitor.handle_stall(&move || { cc.fetch_add(1, Ordering::SeqCst); }).await;
        assert_eq!(checkpoint_calls.load(Ordering::SeqCst), 1);
        assert_eq!(alerts.lock().len(), 1);
        assert!(alerts.lock()[0].contains("Agent Stall Detected"));
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let memory = Arc::new(FakeMemory { healthy: true });
        let limiter = Arc::new(RateLimiter::with_default_limits(5.0));
        let monitor = HeartbeatMonitor::new(memory, limiter, Duration::from_secs(30), Duration::from_secs(120), Duration::from_secs(300));
        for _ in 0..150 {
            let health = monitor.check_health().await;
            let mut hist = monitor.state.history.lock();
            hist.push_back(health);
            while hist.len() > HEALTH_HISTORY_LIMIT {
                hist.pop_front();
            }
        }
        assert_eq!(monitor.history(1000).len(), HEALTH_HISTORY_LIMIT);
    }
}
