//! Built-in tools registered with the monologue engine's `ToolRegistry`.

pub mod memory_tool;
pub mod response;
pub mod unknown;
pub mod web_fetch;
pub mod web_search;

pub use memory_tool::{MemorySaveTool, MemorySearchTool};
pub use response::ResponseTool;
pub use unknown::UnknownTool;
pub use web_fetch::WebFetchTool;
pub use web_search::WebSearchTool;
