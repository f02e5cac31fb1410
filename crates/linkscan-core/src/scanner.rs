//! Scan service: from incoming chat text to delivered reports
//!
//! [`Scanner`] turns one subject URL into a terminal [`ScanResult`].
//! [`ScanService`] sits between a chat [`Transport`] and the scanner: every
//! URL found in an incoming message gets its own task, which posts a
//! placeholder, runs the investigation, then edits the placeholder into the
//! report or a failure notice.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::contract::ScanResult;
use crate::error::Result;
use crate::formatting::{format_report, truncate_str};
use crate::orchestration::{create_standard_tool_registry, SystemPrompt};
use crate::provider::ChatBackend;
use crate::session::{InvestigationDriver, SessionStore};
use crate::subject;
use crate::tools::ToolRegistry;

/// Identifier of a delivered chat message
pub type MessageId = String;

/// Longest subject echoed back in placeholder and failure texts
const SUBJECT_DISPLAY_CHARS: usize = 80;

/// Chat surface the service replies through
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a new message and return its id
    async fn send(&self, recipient: &str, text: &str) -> Result<MessageId>;

    /// Replace the text of a delivered message
    async fn edit(&self, recipient: &str, message_id: &MessageId, text: &str) -> Result<MessageId>;
}

/// Runs investigations for individual subjects
pub struct Scanner {
    driver: InvestigationDriver,
    long_url_threshold: usize,
}

impl Scanner {
    pub fn new(driver: InvestigationDriver) -> Self {
        Self {
            driver,
            long_url_threshold: crate::config::ScanConfig::default().long_url_threshold,
        }
    }

    pub fn with_long_url_threshold(mut self, threshold: usize) -> Self {
        self.long_url_threshold = threshold;
        self
    }

    /// Assemble the standard tools, system instruction and session store
    pub fn from_config(config: &Config, backend: Arc<dyn ChatBackend>) -> Self {
        let registry = create_standard_tool_registry(&config.tools);
        Self::with_registry(config, backend, registry)
    }

    /// Like [`Scanner::from_config`] with a caller-supplied tool registry
    pub fn with_registry(
        config: &Config,
        backend: Arc<dyn ChatBackend>,
        registry: ToolRegistry,
    ) -> Self {
        let system_prompt = SystemPrompt::new(&registry)
            .with_explanation_language(config.scan.explanation_language.as_str())
            .build();
        let sessions = Arc::new(
            SessionStore::new(system_prompt).with_max_history_turns(config.scan.max_history_turns),
        );
        let driver = InvestigationDriver::new(backend, sessions, registry)
            .with_max_iterations(config.scan.max_iterations);

        Self::new(driver).with_long_url_threshold(config.scan.long_url_threshold)
    }

    pub fn driver(&self) -> &InvestigationDriver {
        &self.driver
    }

    /// Investigate one subject URL
    pub async fn investigate(&self, subject: &str) -> Result<ScanResult> {
        let id = subject::investigation_id(subject);
        let prompt = subject::initial_prompt(subject, &id, self.long_url_threshold);
        self.driver.run(subject, &id, &prompt).await
    }
}

/// Routes incoming chat messages to investigations
#[derive(Clone)]
pub struct ScanService {
    scanner: Arc<Scanner>,
    transport: Arc<dyn Transport>,
    footer: Arc<str>,
}

impl ScanService {
    pub fn new(
        scanner: Arc<Scanner>,
        transport: Arc<dyn Transport>,
        footer: impl Into<String>,
    ) -> Self {
        Self {
            scanner,
            transport,
            footer: footer.into().into(),
        }
    }

    pub fn scanner(&self) -> &Arc<Scanner> {
        &self.scanner
    }

    /// Append the footer to an outgoing text
    pub fn with_footer(&self, text: &str) -> String {
        if self.footer.is_empty() {
            text.to_string()
        } else {
            format!("{}\n\n{}", text, self.footer)
        }
    }

    /// Start one investigation task per URL in `text`
    ///
    /// Tasks run independently; the returned handles may be awaited or
    /// dropped. Messages without URLs start nothing.
    pub fn handle_message(&self, recipient: &str, text: &str) -> Vec<JoinHandle<()>> {
        let urls = subject::extract_urls(text);
        if !urls.is_empty() {
            info!(recipient = %recipient, count = urls.len(), "Found URLs in message");
        }

        urls.into_iter()
            .map(|url| {
                let service = self.clone();
                let recipient = recipient.to_string();
                tokio::spawn(async move { service.scan_and_reply(&recipient, &url).await })
            })
            .collect()
    }

    async fn scan_and_reply(&self, recipient: &str, url: &str) {
        let shown = truncate_str(url, SUBJECT_DISPLAY_CHARS);
        let placeholder = self.with_footer(&format!("🔍 Scanning {} ...", shown));
        let placeholder_id = match self.transport.send(recipient, &placeholder).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(recipient = %recipient, error = %e, "Failed to send placeholder");
                None
            }
        };

        let text = match self.scanner.investigate(url).await {
            Ok(result) => self.with_footer(&format_report(&result)),
            Err(e) => {
                error!(url = %shown, error = %e, raw = ?e.raw_payload(), "Scan failed");
                self.with_footer(&format!("⚠️ Error scanning URL: {}", shown))
            }
        };

        let delivered = match &placeholder_id {
            Some(id) => self.transport.edit(recipient, id, &text).await,
            None => self.transport.send(recipient, &text).await,
        };
        if let Err(e) = delivered {
            warn!(recipient = %recipient, error = %e, "Failed to deliver scan result");
        }
    }
}
