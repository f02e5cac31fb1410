//! Investigation driver
//!
//! Runs the bounded request/decode/dispatch loop for one subject:
//! send the pending message, journal the exchange, decode the reply, and
//! either return a terminal result or execute the requested tools and feed
//! their outcomes back.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::store::SessionStore;
use crate::contract::{self, ScanResult};
use crate::error::{Error, Result};
use crate::provider::ChatBackend;
use crate::tools::ToolRegistry;

/// Maximum backend requests per investigation
pub const MAX_ITERATIONS: usize = 5;

pub struct InvestigationDriver {
    backend: Arc<dyn ChatBackend>,
    sessions: Arc<SessionStore>,
    registry: ToolRegistry,
    max_iterations: usize,
}

impl InvestigationDriver {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        sessions: Arc<SessionStore>,
        registry: ToolRegistry,
    ) -> Self {
        Self {
            backend,
            sessions,
            registry,
            max_iterations: MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Run one investigation to a terminal result
    ///
    /// The session for `investigation_id` is locked for the whole run, so
    /// concurrent runs for the same id are serialized. Every exchange is
    /// journaled before its reply is decoded.
    pub async fn run(
        &self,
        subject: &str,
        investigation_id: &str,
        initial_prompt: &str,
    ) -> Result<ScanResult> {
        let handle = self.sessions.get_or_create(investigation_id);
        let mut session = handle.lock().await;

        info!(
            investigation_id = %investigation_id,
            subject = %subject,
            backend = %self.backend.name(),
            "Starting investigation"
        );

        let mut pending = initial_prompt.to_string();
        for iteration in 1..=self.max_iterations {
            debug!(investigation_id = %investigation_id, iteration, "Sending request");

            let raw = self.backend.send(&session, &pending).await?;
            session.record_exchange(pending.as_str(), raw.as_str());

            let result = contract::decode(&raw)?;
            info!(
                investigation_id = %investigation_id,
                iteration,
                status = %result.status,
                tool_calls = result.tool_calls.len(),
                "Decoded reply"
            );

            if result.status.is_terminal() {
                return Ok(result);
            }

            if result.tool_calls.is_empty() {
                warn!(
                    investigation_id = %investigation_id,
                    iteration,
                    "ONGOING reply without tool calls"
                );
                return Err(Error::contract("ONGOING reply requested no tools", raw));
            }

            let outcome = self.registry.dispatch(&result.tool_calls).await;
            pending = contract::encode(&outcome);
        }

        warn!(
            investigation_id = %investigation_id,
            max_iterations = self.max_iterations,
            "Investigation did not conclude"
        );
        Err(Error::IterationLimit(self.max_iterations))
    }
}
