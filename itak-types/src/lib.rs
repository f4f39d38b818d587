//! # itak-types
//!
//! Core type definitions for the iTaK agent kernel.
//!
//! This crate is the foundation of the dependency graph -- every other
//! `itak-*` crate depends on it, and it depends on nothing async. It
//! contains:
//!
//! - **[`error`]** -- [`ItakError`] and [`ToolError`]
//! - **[`secret`]** -- [`secret::SecretString`], a redact-on-read wrapper
//! - **[`message`]** -- [`message::Message`], [`message::Role`], the History type
//! - **[`context`]** -- [`context::AgentContext`], [`context::IterationState`]
//! - **[`tool`]** -- [`tool::ToolCall`], [`tool::ToolResult`]
//! - **[`heal`]** -- error classification and self-heal attempt records
//! - **[`mcp`]** -- MCP server/tool configuration types
//! - **[`rate`]** -- rate-limiter category and bucket types
//! - **[`checkpoint`]** -- [`checkpoint::CheckpointSnapshot`]

pub mod checkpoint;
pub mod context;
pub mod error;
pub mod heal;
pub mod mcp;
pub mod message;
pub mod rate;
pub mod secret;
pub mod tool;

pub use error::{ItakError, Result, ToolError};
