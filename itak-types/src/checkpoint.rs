//! Checkpoint snapshot type (spec.md §3, §4.9, §6).
//!
//! Grounded directly on `original_source/core/checkpoint.py`'s saved-state
//! dict shape.

use crate::message::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A point-in-time snapshot of monologue state, written atomically to
/// `data/db/checkpoint.json` (temp file + rename).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointSnapshot {
    pub timestamp: f64,
    pub iteration: u32,
    pub room_id: String,
    pub adapter: String,
    /// The most recent up-to-50 messages (spec.md §3 bounds this).
    pub history: Vec<Message>,
    pub last_response: Option<String>,
    pub progress: Value,
}

/// The maximum number of history messages a checkpoint retains.
pub const CHECKPOINT_HISTORY_LIMIT: usize = 50;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn round_trips_through_json() {
        let snap = CheckpointSnapshot {
            timestamp: 1000.0,
            iteration: 3,
            room_id: "room-1".into(),
            adapter: "cli".into(),
            history: vec![Message::new(Role::User, "hi")],
            last_response: Some("hi there".into()),
            progress: serde_json::json!({"steps": []}),
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: CheckpointSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.iteration, 3);
        assert_eq!(back.history.len(), 1);
    }
}
