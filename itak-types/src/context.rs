//! Per-request scratch state (spec.md §3 "AgentContext", "IterationState").

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// Per-request scratch space. Created per conversation, mutated by the
/// adapter and by extensions, destroyed when the adapter session ends.
#[derive(Debug)]
pub struct AgentContext {
    pub adapter_name: String,
    pub room_id: String,
    pub user_id: String,
    pub intervention_queue: VecDeque<String>,
    pub data: HashMap<String, serde_json::Value>,
}

impl AgentContext {
    pub fn new(adapter_name: impl Into<String>, room_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            adapter_name: adapter_name.into(),
            room_id: room_id.into(),
            user_id: user_id.into(),
            intervention_queue: VecDeque::new(),
            data: HashMap::new(),
        }
    }

    /// Enqueue a message to preempt the next monologue turn (spec.md §4.1
    /// "Intervention delivery").
    pub fn queue_intervention(&mut self, message: impl Into<String>) {
        self.intervention_queue.push_back(message.into());
    }

    /// Pop the next pending intervention, if any.
    pub fn pop_intervention(&mut self) -> Option<String> {
        self.intervention_queue.pop_front()
    }
}

/// Mutable counters for one `MonologueEngine::run` invocation plus the
/// process-lifetime cumulative counter (spec.md §3 "IterationState").
#[derive(Debug)]
pub struct IterationState {
    pub iteration_count: u32,
    pub total_iterations: u64,
    pub last_response: Option<String>,
    pub start_time: Instant,
}

impl IterationState {
    pub fn new() -> Self {
        Self {
            iteration_count: 0,
            total_iterations: 0,
            last_response: None,
            start_time: Instant::now(),
        }
    }

    /// Advance both counters by one turn.
    pub fn advance(&mut self) {
        self.iteration_count += 1;
        self.total_iterations += 1;
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

impl Default for IterationState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervention_queue_is_fifo() {
        let mut ctx = AgentContext::new("cli", "room-1", "user-1");
        ctx.queue_intervention("first");
        ctx.queue_intervention("second");
        assert_eq!(ctx.pop_intervention().as_deref(), Some("first"));
        assert_eq!(ctx.pop_intervention().as_deref(), Some("second"));
        assert_eq!(ctx.pop_intervention(), None);
    }

    #[test]
    fn iteration_state_advance_keeps_both_counters_in_step() {
        let mut state = IterationState::new();
        state.advance();
        state.advance();
        assert_eq!(state.iteration_count, 2);
        assert_eq!(state.total_iterations, 2);
    }
}
