//! Fan-out of plan/step/progress/complete/error events to registered
//! adapter callbacks (spec.md §4.8).
//!
//! Grounded directly on `original_source/core/progress.py`.

use std::time::Instant;

/// One planned or in-progress unit of work.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Step {
    pub description: String,
    pub status: String,
}

/// A single event fan-out by `ProgressTracker`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Plan { plan_text: String },
    StepAdded { index: usize, description: String, status: String },
    Progress { message: String, step_index: Option<usize>, elapsed_seconds: f64 },
    StepComplete { step_index: usize, result: String },
    Complete { summary: String, total_steps: usize, elapsed_seconds: f64, steps: Vec<Step> },
    Error { message: String },
}

type Callback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Tracks the plan/step state of one monologue run and fans out events to
/// every registered callback, in registration order. Callback panics are
/// not caught here (callbacks are expected to be infallible closures); a
/// callback that needs fallible I/O should swallow its own errors, matching
/// the original's "exceptions are logged and ignored" contract.
pub struct ProgressTracker {
    steps: Vec<Step>,
    current_step: usize,
    plan_text: String,
    start_time: Instant,
    callbacks: Vec<Callback>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            current_step: 0,
            plan_text: String::new(),
            start_time: Instant::now(),
            callbacks: Vec::new(),
        }
    }

    pub fn register_callback(&mut self, callback: impl Fn(&ProgressEvent) + Send + Sync + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    fn broadcast(&self, event: ProgressEvent) {
        for cb in &self.callbacks {
            cb(&event);
        }
    }

    pub fn plan(&mut self, plan_text: impl Into<String>) {
        self.steps.clear();
        self.current_step = 0;
        self.plan_text = plan_text.into();
        self.broadcast(ProgressEvent::Plan { plan_text: self.plan_text.clone() });
    }

    pub fn add_step(&mut self, description: impl Into<String>, status: impl Into<String>) {
        let description = description.into();
        let status = status.into();
        self.steps.push(Step { description: description.clone(), status: status.clone() });
        self.broadcast(ProgressEvent::StepAdded {
            index: self.steps.len() - 1,
            description,
            status,
        });
    }

    pub fn update(&mut self, message: impl Into<String>, step_index: Option<usize>) {
        self.current_step += 1;
        self.broadcast(ProgressEvent::Progress {
            message: message.into(),
            step_index,
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        });
    }

    pub fn complete_step(&mut self, step_index: usize, result: impl Into<String>) {
        let result = result.into();
        if let Some(step) = self.steps.get_mut(step_index) {
            step.status = "complete".to_string();
        }
        self.broadcast(ProgressEvent::StepComplete { step_index, result });
    }

    pub fn complete(&mut self, summary: impl Into<String>) {
        self.broadcast(ProgressEvent::Complete {
            summary: summary.into(),
            total_steps: self.steps.len(),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
            steps: self.steps.clone(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.broadcast(ProgressEvent::Error { message: message.into() });
    }

    /// Serializable snapshot of current plan state, used by
    /// `CheckpointManager::save` (spec.md §3 "CheckpointSnapshot.progress_state").
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "plan_text": self.plan_text,
            "current_step": self.current_step,
            "steps": self.steps,
        })
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a Unicode block-character progress bar, e.g. `[████████░░░░] 8/12`.
/// Supplemental feature (SPEC_FULL.md §C.1): CLI/Discord-friendly rendering
/// of `current`/`total`, not an event type in its own right.
pub fn format_progress_bar(current: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return format!("[{}] 0/0", "░".repeat(width));
    }
    let filled = ((current as f64 / total as f64) * width as f64).round() as usize;
    let filled = filled.min(width);
    let bar: String = "█".repeat(filled) + &"░".repeat(width - filled);
    format!("[{bar}] {current}/{total}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn callbacks_fire_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut tracker = ProgressTracker::new();

        let o1 = order.clone();
        tracker.register_callback(move |_| o1.lock().unwrap().push(1));
        let o2 = order.clone();
        tracker.register_callback(move |_| o2.lock().unwrap().push(2));

        tracker.plan("do the thing");
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn plan_resets_steps_and_current_step() {
        let mut tracker = ProgressTracker::new();
        tracker.add_step("step one", "pending");
        tracker.update("working", Some(0));
        tracker.plan("new plan");
        assert_eq!(tracker.current_step, 0);
        assert!(tracker.steps.is_empty());
    }

    #[test]
    fn format_progress_bar_renders_partial_fill() {
        let bar = format_progress_bar(5, 10, 20);
        assert_eq!(bar, "[██████████░░░░░░░░░░] 5/10");
    }

    #[test]
    fn format_progress_bar_handles_zero_total() {
        assert_eq!(format_progress_bar(0, 0, 4), "[░░░░] 0/0");
    }
}
