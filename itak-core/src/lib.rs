//! # itak-core
//!
//! The monologue engine and everything it directly depends on: the
//! extension hook pipeline, tool parsing/resolution, MCP client,
//! self-healing pipeline, heartbeat/liveness monitoring, structured
//! event logging, checkpointing, and progress broadcast.
//!
//! Transport adapters, LLM providers, and memory backends are specified
//! only as ports (see [`ports`]); concrete implementations live outside
//! this crate.

pub mod agent;
pub mod checkpoint;
pub mod heal;
pub mod heartbeat;
pub mod logger;
pub mod mcp;
pub mod ports;
pub mod progress;
pub mod tools;

pub use agent::{AgentConfig, MonologueEngine};
pub use checkpoint::CheckpointManager;
pub use heal::SelfHealEngine;
pub use heartbeat::HeartbeatMonitor;
pub use logger::Logger;
pub use mcp::MCPClient;
pub use ports::{AdapterPort, ChatRequest, MemoryHealth, MemoryHit, MemoryPort, ModelRouterPort};
pub use progress::ProgressTracker;
pub use tools::{Tool, ToolRegistry};
