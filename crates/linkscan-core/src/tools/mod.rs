//! Tool system for URL investigations
//!
//! Tools are the evidence sources the backend can ask for. Each tool has:
//! - A name and description for the system instruction
//! - A JSON schema for its single argument mapping
//! - An execute method returning a payload or a [`ToolError`]

pub mod lexical;
pub mod page_content;
pub mod safe_browsing;
pub mod short_url;
pub mod whois;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::contract::{flatten_payload, ToolCall, ToolOutcome};
use crate::error::ToolError;

pub use lexical::LexicalAnalysis;
pub use page_content::FetchPageContent;
pub use safe_browsing::CheckSafeBrowsing;
pub use short_url::ResolveShortUrl;
pub use whois::GetWhoisData;

/// Argument mapping passed to a tool
pub type ToolArguments = HashMap<String, String>;

/// Output from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The payload (plain text or a structured value)
    pub content: Value,
}

impl ToolOutput {
    pub fn success(content: impl Into<Value>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Payload rendered as text for the backend
    pub fn to_text(&self) -> String {
        flatten_payload(&self.content)
    }
}

/// Tool definition for the system instruction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// Names of the declared arguments
    pub fn argument_names(&self) -> Vec<&str> {
        self.parameters["properties"]
            .as_object()
            .map(|props| props.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Core trait for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used by the backend to invoke)
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments
    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError>;

    /// Convert to tool definition for the system instruction
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Bytes worth reading from a remote body to fill `max_chars` characters
pub(crate) fn body_byte_cap(max_chars: usize) -> usize {
    max_chars.saturating_mul(4)
}

/// Fetch a required argument or fail with `InvalidParams`
pub fn required_arg<'a>(arguments: &'a ToolArguments, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ToolError::InvalidParams(format!("{} is required", key)))
}

/// Registry of available tools
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Sorted tool names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Definitions of all tools, sorted by name
    pub fn list(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run one batch of tool calls
    ///
    /// Calls run sequentially in arrival order. Failures and unknown names
    /// become error entries; a later call with the same name overwrites the
    /// earlier entry.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> ToolOutcome {
        let mut outcome = ToolOutcome::new();

        for call in calls {
            let Some(tool) = self.get(&call.name) else {
                warn!(tool = %call.name, "Backend requested an unknown tool");
                outcome.failure(&call.name, ToolError::NotFound(call.name.clone()).to_string());
                continue;
            };

            debug!(tool = %call.name, arguments = ?call.arguments, "Executing tool");
            match tool.execute(&call.arguments).await {
                Ok(output) => {
                    let text = output.to_text();
                    info!(tool = %call.name, bytes = text.len(), "Tool succeeded");
                    outcome.success(&call.name, text);
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool failed");
                    outcome.failure(&call.name, e.to_string());
                }
            }
        }

        outcome
    }
}

/// Helper macro for creating tool parameter schemas
#[macro_export]
macro_rules! tool_params {
    ($($field:ident : $type:expr => $desc:expr),* $(,)?) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $( stringify!($field): { "type": $type, "description": $desc } ),*
            },
            "required": [ $( stringify!($field) ),* ]
        })
    };
}
