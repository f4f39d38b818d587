//! Structured event logging: 14 event types, dual JSONL + SQLite storage,
//! UTC-midnight rotation (spec.md §6).
//!
//! Grounded directly on `original_source/core/logger.py`. Distinct from the
//! `tracing` diagnostic logging used elsewhere in this crate (SPEC_FULL.md
//! §B "Logging"): this `Logger` is an application-level structured event
//! sink that the monologue engine, tool registry, and self-heal pipeline
//! write business events to, queryable for cost summaries and history.

use chrono::{DateTime, Utc};
use itak_security::LoggerSecretSink;
use parking_lot::Mutex;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// The 14 structured event types iTaK logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    UserMessage,
    AgentResponse,
    AgentThoughts,
    ToolExecution,
    ToolResult,
    MemoryAccess,
    MemorySave,
    Error,
    CriticalError,
    Warning,
    Intervention,
    ExtensionFired,
    AgentComplete,
    System,
}

impl EventType {
    fn as_str(self) -> &'static str {
        match self {
            EventType::UserMessage => "user_message",
            EventType::AgentResponse => "agent_response",
            EventType::AgentThoughts => "agent_thoughts",
            EventType::ToolExecution => "tool_execution",
            EventType::ToolResult => "tool_result",
            EventType::MemoryAccess => "memory_access",
            EventType::MemorySave => "memory_save",
            EventType::Error => "error",
            EventType::CriticalError => "critical_error",
            EventType::Warning => "warning",
            EventType::Intervention => "intervention",
            EventType::ExtensionFired => "extension_fired",
            EventType::AgentComplete => "agent_complete",
            EventType::System => "system",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct LogEntry {
    timestamp: f64,
    datetime: String,
    event_type: &'static str,
    room_id: String,
    adapter: String,
    data: String,
    tokens_used: u64,
    cost_usd: f64,
}

/// One row returned by [`Logger::query`].
#[derive(Debug, Clone)]
pub struct LogRow {
    pub id: i64,
    pub timestamp: f64,
    pub datetime: String,
    pub event_type: String,
    pub room_id: String,
    pub adapter: String,
    pub data: String,
    pub tokens_used: i64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CostSummary {
    pub total_tokens: i64,
    pub total_cost: f64,
    pub total_events: i64,
    pub period_days: u32,
}

pub struct LoggerConfig {
    pub jsonl_dir: PathBuf,
    pub sqlite_path: PathBuf,
    pub mask_secrets: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            jsonl_dir: PathBuf::from("data/logs"),
            sqlite_path: PathBuf::from("data/db/logs.db"),
            mask_secrets: true,
        }
    }
}

struct RotationState {
    current_date: String,
}

/// Dual-write structured event logger. Every write goes to both a
/// UTC-midnight-rotated JSONL file and a SQLite table; SQLite failures are
/// swallowed (best-effort, matching the original's "don't crash if SQLite
/// fails" contract) since the JSONL file is the durable record of truth.
pub struct Logger {
    jsonl_dir: PathBuf,
    sqlite_path: PathBuf,
    mask_secrets: bool,
    secrets: Mutex<Vec<String>>,
    rotation: Mutex<RotationState>,
}

impl Logger {
    pub fn new(config: LoggerConfig) -> itak_types::Result<Self> {
        std::fs::create_dir_all(&config.jsonl_dir)?;
        if let Some(parent) = config.sqlite_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let logger = Self {
            jsonl_dir: config.jsonl_dir,
            sqlite_path: config.sqlite_path,
            mask_secrets: config.mask_secrets,
            secrets: Mutex::new(Vec::new()),
            rotation: Mutex::new(RotationState { current_date: String::new() }),
        };
        logger.init_sqlite();
        Ok(logger)
    }

    fn init_sqlite(&self) {
        let result = (|| -> rusqlite::Result<()> {
            let conn = Connection::open(&self.sqlite_path)?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    timestamp REAL NOT NULL,
                    datetime TEXT NOT NULL,
                    event_type TEXT NOT NULL,
                    room_id TEXT DEFAULT 'default',
                    adapter TEXT DEFAULT 'cli',
                    data TEXT,
                    tokens_used INTEGER DEFAULT 0,
                    cost_usd REAL DEFAULT 0.0
                );
                CREATE INDEX IF NOT EXISTS idx_logs_event_type ON logs(event_type);
                CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp);",
            )?;
            // FTS5 may be unavailable in the bundled sqlite build; ignore if so.
            let _ = conn.execute_batch(
                "CREATE VIRTUAL TABLE IF NOT EXISTS logs_fts USING fts5(data, content=logs, content_rowid=id);",
            );
            Ok(())
        })();
        if let Err(err) = result {
            tracing::warn!(%err, "sqlite log store init failed, continuing with jsonl only");
        }
    }

    fn mask(&self, text: &str) -> String {
        if !self.mask_secrets {
            return text.to_string();
        }
        let mut out = text.to_string();
        for secret in self.secrets.lock().iter() {
            if out.contains(secret.as_str()) {
                let masked = itak_security::mask_value(secret);
                out = out.replace(secret.as_str(), &masked);
            }
        }
        out
    }

    fn jsonl_path(&self) -> PathBuf {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let mut state = self.rotation.lock();
        if state.current_date != today {
            state.current_date = today.clone();
        }
        self.jsonl_dir.join(format!("{today}.jsonl"))
    }

    /// Writes a structured entry to both stores. `data` is stringified
    /// (and secret-masked) the same way the original log() does: strings
    /// pass through as-is, other JSON values are serialized first.
    pub fn log(
        &self,
        event_type: EventType,
        data: Option<&Value>,
        room_id: &str,
        adapter: &str,
        tokens_used: u64,
        cost_usd: f64,
    ) {
        let now: DateTime<Utc> = Utc::now();
        let timestamp = now.timestamp() as f64 + now.timestamp_subsec_millis() as f64 / 1000.0;

        let raw = match data {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let data_str = self.mask(&raw);

        let entry = LogEntry {
            timestamp,
            datetime: now.to_rfc3339(),
            event_type: event_type.as_str(),
            room_id: room_id.to_string(),
            adapter: adapter.to_string(),
            data: data_str,
            tokens_used,
            cost_usd,
        };

        self.write_jsonl(&entry);
        self.write_sqlite(&entry);
    }

    fn write_jsonl(&self, entry: &LogEntry) {
        let result = (|| -> std::io::Result<()> {
            let path = self.jsonl_path();
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            let line = serde_json::to_string(entry).unwrap_or_default();
            writeln!(file, "{line}")?;
            Ok(())
        })();
        if let Err(err) = result {
            tracing::warn!(%err, "jsonl log write failed");
        }
    }

    fn write_sqlite(&self, entry: &LogEntry) {
        let result = (|| -> rusqlite::Result<()> {
            let conn = Connection::open(&self.sqlite_path)?;
            conn.execute(
                "INSERT INTO logs (timestamp, datetime, event_type, room_id, adapter, data, tokens_used, cost_usd)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    entry.timestamp,
                    entry.datetime,
                    entry.event_type,
                    entry.room_id,
                    entry.adapter,
                    entry.data,
                    entry.tokens_used,
                    entry.cost_usd,
                ],
            )?;
            Ok(())
        })();
        if let Err(err) = result {
            tracing::warn!(%err, "sqlite log write failed");
        }
    }

    /// Queries the SQLite store, most recent first. Returns an empty vec on
    /// any storage error rather than propagating, matching the original's
    /// best-effort `query`.
    pub fn query(
        &self,
        event_type: Option<&str>,
        room_id: Option<&str>,
        limit: u32,
        search: Option<&str>,
    ) -> Vec<LogRow> {
        let result = (|| -> rusqlite::Result<Vec<LogRow>> {
            let conn = Connection::open(&self.sqlite_path)?;
            let mut sql = String::from("SELECT id, timestamp, datetime, event_type, room_id, adapter, data, tokens_used, cost_usd FROM logs");
            let mut conditions = Vec::new();
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(et) = event_type {
                conditions.push("event_type = ?".to_string());
                params.push(Box::new(et.to_string()));
            }
            if let Some(rid) = room_id {
                conditions.push("room_id = ?".to_string());
                params.push(Box::new(rid.to_string()));
            }
            if let Some(s) = search {
                conditions.push("data LIKE ?".to_string());
                params.push(Box::new(format!("%{s}%")));
            }
            if !conditions.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&conditions.join(" AND "));
            }
            sql.push_str(" ORDER BY timestamp DESC LIMIT ?");
            params.push(Box::new(limit));

            let mut stmt = conn.prepare(&sql)?;
            let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let rows = stmt.query_map(param_refs.as_slice(), |row| {
                Ok(LogRow {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    datetime: row.get(2)?,
                    event_type: row.get(3)?,
                    room_id: row.get(4)?,
                    adapter: row.get(5)?,
                    data: row.get(6)?,
                    tokens_used: row.get(7)?,
                    cost_usd: row.get(8)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })();
        result.unwrap_or_else(|err| {
            tracing::warn!(%err, "log query failed");
            Vec::new()
        })
    }

    /// Token/cost totals over the last `days` days.
    pub fn cost_summary(&self, days: u32) -> CostSummary {
        let result = (|| -> rusqlite::Result<CostSummary> {
            let cutoff = Utc::now().timestamp() as f64 - (days as f64 * 86400.0);
            let conn = Connection::open(&self.sqlite_path)?;
            conn.query_row(
                "SELECT SUM(tokens_used), SUM(cost_usd), COUNT(*) FROM logs WHERE timestamp > ?1",
                [cutoff],
                |row| {
                    let total_tokens: Option<i64> = row.get(0)?;
                    let total_cost: Option<f64> = row.get(1)?;
                    let total_events: i64 = row.get(2)?;
                    Ok(CostSummary {
                        total_tokens: total_tokens.unwrap_or(0),
                        total_cost: (total_cost.unwrap_or(0.0) * 10_000.0).round() / 10_000.0,
                        total_events,
                        period_days: days,
                    })
                },
            )
        })();
        result.unwrap_or(CostSummary { period_days: days, ..Default::default() })
    }

    pub fn jsonl_dir(&self) -> &Path {
        &self.jsonl_dir
    }
}

impl LoggerSecretSink for Logger {
    fn register_secret(&mut self, secret: &str) {
        if secret.len() > 3 {
            self.secrets.lock().push(secret.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(label: &str) -> LoggerConfig {
        let base = std::env::temp_dir().join(format!("itak-logger-test-{label}-{}", std::process::id()));
        LoggerConfig {
            jsonl_dir: base.join("logs"),
            sqlite_path: base.join("db").join("logs.db"),
            mask_secrets: true,
        }
    }

    #[test]
    fn log_and_query_round_trip() {
        let config = temp_config("roundtrip");
        let base = config.jsonl_dir.parent().unwrap().to_path_buf();
        let logger = Logger::new(config).unwrap();

        logger.log(EventType::UserMessage, Some(&Value::String("hello".into())), "room-1", "cli", 10, 0.001);
        let rows = logger.query(Some("user_message"), None, 10, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data, "hello");
        assert_eq!(rows[0].room_id, "room-1");

        std::fs::remove_dir_all(base).ok();
    }

    #[test]
    fn secrets_are_masked_in_logged_data() {
        let config = temp_config("mask");
        let base = config.jsonl_dir.parent().unwrap().to_path_buf();
        let mut logger = Logger::new(config).unwrap();
        logger.register_secret("sk-supersecretvalue");

        logger.log(
            EventType::System,
            Some(&Value::String("key is sk-supersecretvalue in use".into())),
            "default",
            "cli",
            0,
            0.0,
        );
        let rows = logger.query(None, None, 10, None);
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].data.contains("supersecretvalue"));
        assert!(rows[0].data.contains("sk-"));

        std::fs::remove_dir_all(base).ok();
    }

    #[test]
    fn cost_summary_aggregates_recent_events() {
        let config = temp_config("cost");
        let base = config.jsonl_dir.parent().unwrap().to_path_buf();
        let logger = Logger::new(config).unwrap();

        logger.log(EventType::AgentResponse, None, "default", "cli", 100, 0.02);
        logger.log(EventType::AgentResponse, None, "default", "cli", 50, 0.01);

        let summary = logger.cost_summary(7);
        assert_eq!(summary.total_tokens, 150);
        assert!((summary.total_cost - 0.03).abs() < 1e-9);
        assert_eq!(summary.total_events, 2);

        std::fs::remove_dir_all(base).ok();
    }

    #[test]
    fn query_filters_by_room_id() {
        let config = temp_config("filter");
        let base = config.jsonl_dir.parent().unwrap().to_path_buf();
        let logger = Logger::new(config).unwrap();

        logger.log(EventType::UserMessage, None, "room-a", "cli", 0, 0.0);
        logger.log(EventType::UserMessage, None, "room-b", "cli", 0, 0.0);

        let rows = logger.query(None, Some("room-a"), 10, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].room_id, "room-a");

        std::fs::remove_dir_all(base).ok();
    }
}
