//! The monologue engine and its extension hook pipeline (spec.md §4.1,
//! §4.2).

pub mod extensions;
pub mod monologue;

pub use extensions::{Extension, ExtensionPipeline, Hook, HookOutcome, HookPayload, SECURITY_BLOCKED};
pub use monologue::{AgentConfig, MonologueEngine};
