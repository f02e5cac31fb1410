//! linkscan core - backend-driven URL investigation
//!
//! This crate provides the core functionality for linkscan:
//! - The JSON contract spoken with the generative backend
//! - Investigation tools (lexical analysis, short URLs, page content, WHOIS, Safe Browsing)
//! - Per-investigation sessions and the bounded investigation loop
//! - Chat-ready report formatting
//! - The scan service that routes chat messages to investigations

pub mod config;
pub mod contract;
pub mod error;
pub mod formatting;
pub mod orchestration;
pub mod provider;
pub mod scanner;
pub mod session;
pub mod subject;
pub mod tools;

pub use config::{Config, ConfigManager, ProviderConfig, ScanConfig, ToolsConfig};
pub use error::{Error, Result, ToolError};
pub use provider::{create_provider, ChatBackend, GenAIProvider, ProviderType};
pub use tools::{Tool, ToolDefinition, ToolOutput, ToolRegistry};

// Contract exports
pub use contract::{ScanResult, ScanStatus, ToolCall, ToolOutcome, Verdict, VerdictCategory};

// Orchestration exports
pub use orchestration::{create_standard_tool_registry, SystemPrompt, ToolRegistryBuilder};

// Session exports
pub use session::{InvestigationDriver, Session, SessionStore};

pub use formatting::format_report;
pub use scanner::{MessageId, ScanService, Scanner, Transport};
pub use subject::{extract_urls, investigation_id};
