//! Atomic periodic snapshot of monologue state for crash recovery
//! (spec.md §4.9, §6).
//!
//! Grounded directly on `original_source/core/checkpoint.py`: atomic
//! temp-file-then-rename save, last-50-message history bound, age-based
//! staleness check.

use itak_types::checkpoint::{CheckpointSnapshot, CHECKPOINT_HISTORY_LIMIT};
use itak_types::message::History;
use itak_types::Result;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CheckpointManager {
    dir: PathBuf,
}

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

impl CheckpointManager {
    /// `dir` is typically `data/db`; the checkpoint file lives at
    /// `<dir>/checkpoint.json`, matching spec.md §6's layout.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.dir.join("checkpoint.json")
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join("checkpoint.tmp")
    }

    /// Writes `history`/`iteration`/etc. atomically: write to a temp file,
    /// then rename over the real checkpoint. On any failure the temp file
    /// is removed so a reader never observes a partial write.
    pub fn save(
        &self,
        iteration: u32,
        room_id: &str,
        adapter: &str,
        history: &History,
        last_response: Option<&str>,
        progress: serde_json::Value,
    ) -> Result<()> {
        let tail: Vec<_> = history.tail(CHECKPOINT_HISTORY_LIMIT).to_vec();
        let snapshot = CheckpointSnapshot {
            timestamp: now_unix(),
            iteration,
            room_id: room_id.to_string(),
            adapter: adapter.to_string(),
            history: tail,
            last_response: last_response.map(str::to_string),
            progress,
        };

        let write_result = (|| -> Result<()> {
            let json = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(self.temp_path(), json)?;
            std::fs::rename(self.temp_path(), self.checkpoint_path())?;
            Ok(())
        })();

        if write_result.is_err() {
            let _ = std::fs::remove_file(self.temp_path());
        }
        write_result
    }

    /// Loads the checkpoint if present and well-formed. A missing file or a
    /// decode/IO error both return `None`, mirroring the original's
    /// best-effort `load`.
    pub fn load(&self) -> Option<CheckpointSnapshot> {
        let path = self.checkpoint_path();
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.checkpoint_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint_path().exists()
    }

    /// Age of the checkpoint in seconds, or `None` if no valid checkpoint
    /// exists.
    pub fn checkpoint_age(&self) -> Option<f64> {
        let snapshot = self.load()?;
        Some(now_unix() - snapshot.timestamp)
    }

    pub fn path(&self) -> &Path {
        self.dir.as_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itak_types::message::Message;

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("itak-checkpoint-test-{label}-{}", std::process::id()))
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = temp_dir("roundtrip");
        let mgr = CheckpointManager::new(&dir).unwrap();
        let mut history = History::new();
        history.push(Message::user("hi"));
        mgr.save(3, "room-1", "cli", &history, Some("hi there"), serde_json::json!({})).unwrap();

        let loaded = mgr.load().unwrap();
        assert_eq!(loaded.iteration, 3);
        assert_eq!(loaded.room_id, "room-1");
        assert_eq!(loaded.history.len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_returns_none_when_missing() {
        let dir = temp_dir("missing");
        let mgr = CheckpointManager::new(&dir).unwrap();
        assert!(mgr.load().is_none());
        assert!(!mgr.has_checkpoint());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = temp_dir("clear");
        let mgr = CheckpointManager::new(&dir).unwrap();
        let history = History::new();
        mgr.save(1, "r", "a", &history, None, serde_json::json!({})).unwrap();
        assert!(mgr.has_checkpoint());
        mgr.clear().unwrap();
        assert!(!mgr.has_checkpoint());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn checkpoint_age_is_near_zero_right_after_save() {
        let dir = temp_dir("age");
        let mgr = CheckpointManager::new(&dir).unwrap();
        let history = History::new();
        mgr.save(1, "r", "a", &history, None, serde_json::json!({})).unwrap();
        let age = mgr.checkpoint_age().unwrap();
        assert!(age >= 0.0 && age < 5.0);
        std::fs::remove_dir_all(&dir).ok();
    }
}
