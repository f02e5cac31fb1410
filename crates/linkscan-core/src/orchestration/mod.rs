//! Orchestration shared by every front end
//!
//! - System instruction generation
//! - Standard tool registry construction

mod system_prompt;
mod tool_registry;

pub use system_prompt::SystemPrompt;
pub use tool_registry::{create_standard_tool_registry, ToolRegistryBuilder};
