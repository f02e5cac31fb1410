//! Generative backend abstraction
//!
//! The investigation driver talks to the backend through [`ChatBackend`],
//! so tests can substitute scripted fakes. [`GenAIProvider`] is the real
//! implementation on top of the genai framework, which covers:
//! - Google Gemini (default)
//! - OpenAI
//! - Anthropic
//! - Groq
//! - DeepSeek
//! - Ollama (local)

mod genai_provider;
pub mod logging;

pub use genai_provider::{create_provider, GenAIProvider, ProviderType};

use async_trait::async_trait;

use crate::error::Result;
use crate::session::Session;

/// One request/reply exchange with the backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Send `message` as the next user turn of `session` and return the raw
    /// reply text
    ///
    /// The session is not modified; the caller journals the exchange.
    /// Failures are reported as [`crate::Error::Transport`].
    async fn send(&self, session: &Session, message: &str) -> Result<String>;
}
