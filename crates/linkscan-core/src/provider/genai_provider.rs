//! GenAI-based backend implementation
//!
//! Rebuilds the full request from the session on every exchange (system
//! instruction, journaled turns, then the new message) and streams the reply.

use async_trait::async_trait;
use futures::StreamExt;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent};
use genai::resolver::{self, AuthData, AuthResolver};
use genai::Client;
use genai::WebConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::logging::{log_exchange, ExchangeLog};
use super::ChatBackend;
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::session::{Role, Session};

/// Supported backend provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Google Gemini
    #[default]
    Gemini,
    /// OpenAI
    OpenAI,
    /// Anthropic
    Anthropic,
    /// Groq (fast inference)
    Groq,
    /// DeepSeek
    DeepSeek,
    /// Ollama (local)
    Ollama,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderType::Gemini),
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            "groq" => Ok(ProviderType::Groq),
            "deepseek" => Ok(ProviderType::DeepSeek),
            "ollama" => Ok(ProviderType::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl ProviderType {
    /// Get the default model for this provider
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "gemini-2.5-flash",
            ProviderType::OpenAI => "gpt-4o-mini",
            ProviderType::Anthropic => "claude-3-5-haiku-latest",
            ProviderType::Groq => "llama-3.3-70b-versatile",
            ProviderType::DeepSeek => "deepseek-chat",
            ProviderType::Ollama => "llama3.2",
        }
    }

    /// Get the environment variable name for API key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderType::Gemini => Some("GEMINI_API_KEY"),
            ProviderType::OpenAI => Some("OPENAI_API_KEY"),
            ProviderType::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderType::Groq => Some("GROQ_API_KEY"),
            ProviderType::DeepSeek => Some("DEEPSEEK_API_KEY"),
            ProviderType::Ollama => None,
        }
    }

    /// Get the provider type as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "gemini",
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Groq => "groq",
            ProviderType::DeepSeek => "deepseek",
            ProviderType::Ollama => "ollama",
        }
    }
}

/// A backend implementation using genai
pub struct GenAIProvider {
    client: Client,
    provider_type: ProviderType,
    model: String,
    options: ChatOptions,
}

impl GenAIProvider {
    /// Default timeout for backend requests
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    fn web_config(timeout: Duration) -> WebConfig {
        WebConfig::default()
            .with_timeout(timeout)
            .with_connect_timeout(Duration::from_secs(30))
    }

    fn default_options() -> ChatOptions {
        ChatOptions::default()
            .with_temperature(0.2)
            .with_max_tokens(2000)
    }

    /// Create a new provider with default settings (uses environment variables for auth)
    pub fn new(provider_type: ProviderType, model: Option<&str>) -> Self {
        let client = Client::builder()
            .with_web_config(Self::web_config(Self::DEFAULT_TIMEOUT))
            .build();
        Self {
            client,
            provider_type,
            model: model.unwrap_or(provider_type.default_model()).to_string(),
            options: Self::default_options(),
        }
    }

    /// Create a provider with a specific API key
    pub fn with_api_key(provider_type: ProviderType, api_key: &str, model: Option<&str>) -> Self {
        Self::build(provider_type, Some(api_key), model, Self::DEFAULT_TIMEOUT)
    }

    fn build(
        provider_type: ProviderType,
        api_key: Option<&str>,
        model: Option<&str>,
        timeout: Duration,
    ) -> Self {
        let mut builder = Client::builder().with_web_config(Self::web_config(timeout));
        if let Some(api_key) = api_key {
            let api_key = api_key.to_string();
            let auth_resolver = AuthResolver::from_resolver_fn(
                move |_model_iden| -> std::result::Result<Option<AuthData>, resolver::Error> {
                    Ok(Some(AuthData::from_single(api_key.clone())))
                },
            );
            builder = builder.with_auth_resolver(auth_resolver);
        }

        Self {
            client: builder.build(),
            provider_type,
            model: model.unwrap_or(provider_type.default_model()).to_string(),
            options: Self::default_options(),
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.options = self.options.with_temperature(temperature);
        self
    }

    /// Set the reply token limit
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.options = self.options.with_max_tokens(max_tokens);
        self
    }

    /// Get the provider type
    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(session: &Session, message: &str) -> ChatRequest {
        let mut chat_req = ChatRequest::default().with_system(session.system_prompt());
        for turn in session.turns() {
            let msg = match turn.role {
                Role::User => ChatMessage::user(turn.text.as_str()),
                Role::Model => ChatMessage::assistant(turn.text.as_str()),
            };
            chat_req = chat_req.append_message(msg);
        }
        chat_req.append_message(ChatMessage::user(message))
    }

    fn fail(&self, session: &Session, message: &str, error_msg: String) -> Error {
        log_exchange(ExchangeLog {
            model: &self.model,
            investigation_id: session.id(),
            history_len: session.turns().len(),
            message,
            reply: None,
            error: Some(&error_msg),
        });
        Error::Transport(error_msg)
    }
}

#[async_trait]
impl ChatBackend for GenAIProvider {
    fn name(&self) -> &str {
        self.provider_type.as_str()
    }

    async fn send(&self, session: &Session, message: &str) -> Result<String> {
        let chat_req = Self::build_request(session, message);
        debug!(
            model = %self.model,
            investigation_id = %session.id(),
            history_len = session.turns().len(),
            "Sending backend request"
        );

        // Stream the reply to avoid idle timeouts on slow generations
        let stream_response = match self
            .client
            .exec_chat_stream(&self.model, chat_req, Some(&self.options))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = ?e, model = %self.model, "Backend request failed");
                return Err(self.fail(session, message, format!("GenAI error: {:?}", e)));
            }
        };

        let mut content = String::new();
        let mut stream = stream_response.stream;
        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => {
                    content.push_str(&chunk.content);
                }
                Ok(ChatStreamEvent::End(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = ?e, model = %self.model, "Backend stream error");
                    return Err(self.fail(session, message, format!("GenAI stream error: {:?}", e)));
                }
            }
        }

        log_exchange(ExchangeLog {
            model: &self.model,
            investigation_id: session.id(),
            history_len: session.turns().len(),
            message,
            reply: Some(&content),
            error: None,
        });

        Ok(content)
    }
}

/// Build the configured backend
///
/// The API key is resolved from the config first, then the environment; when
/// neither supplies one genai falls back to its own environment lookup.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn ChatBackend>> {
    let provider_type: ProviderType = config
        .provider_type
        .parse()
        .map_err(Error::Config)?;

    let model = config.model.as_deref().filter(|m| !m.is_empty());
    let api_key = config.get_api_key();
    let timeout = config
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(GenAIProvider::DEFAULT_TIMEOUT);

    let provider = GenAIProvider::build(provider_type, api_key.as_deref(), model, timeout)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens);

    debug!(provider = %provider_type, model = %provider.model(), "Backend provider created");
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parse() {
        assert_eq!("gemini".parse::<ProviderType>().unwrap(), ProviderType::Gemini);
        assert_eq!("Google".parse::<ProviderType>().unwrap(), ProviderType::Gemini);
        assert_eq!("OpenAI".parse::<ProviderType>().unwrap(), ProviderType::OpenAI);
        assert!("nope".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_default_models() {
        assert_eq!(ProviderType::default(), ProviderType::Gemini);
        assert_eq!(ProviderType::Gemini.default_model(), "gemini-2.5-flash");
        assert_eq!(ProviderType::Gemini.api_key_env(), Some("GEMINI_API_KEY"));
        assert_eq!(ProviderType::Ollama.api_key_env(), None);
    }

    #[test]
    fn test_build_request_replays_history() {
        let mut session = Session::new("id", "system instruction", 10);
        session.record_exchange("first", "{\"status\":\"ONGOING\"}");
        let req = GenAIProvider::build_request(&session, "second");
        assert_eq!(req.system.as_deref(), Some("system instruction"));
        assert_eq!(req.messages.len(), 3);
    }

    #[test]
    fn test_provider_uses_default_model() {
        let provider = GenAIProvider::with_api_key(ProviderType::Gemini, "test-key", None);
        assert_eq!(provider.model(), "gemini-2.5-flash");
        assert_eq!(provider.name(), "gemini");
    }
}
