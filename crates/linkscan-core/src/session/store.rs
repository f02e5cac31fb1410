//! Session store keyed by investigation id
//!
//! The map lock is a short synchronous lock held only for check-then-create.
//! Each session sits behind its own async mutex, which an investigation
//! holds for its whole run; unrelated ids never wait on each other.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::types::{InvestigationId, Session};

/// Shared handle to one session
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Default cap on turns kept per session
pub const DEFAULT_MAX_HISTORY_TURNS: usize = 40;

/// Owns one session per investigation id for the process lifetime
pub struct SessionStore {
    sessions: Mutex<HashMap<InvestigationId, SessionHandle>>,
    system_prompt: String,
    max_history_turns: usize,
}

impl SessionStore {
    /// Create a store whose new sessions are seeded with `system_prompt`
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            system_prompt: system_prompt.into(),
            max_history_turns: DEFAULT_MAX_HISTORY_TURNS,
        }
    }

    pub fn with_max_history_turns(mut self, max_turns: usize) -> Self {
        self.max_history_turns = max_turns;
        self
    }

    /// Return the session for `id`, creating it on first use
    ///
    /// Concurrent first calls for the same id all receive the same handle.
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions.get(id) {
            return existing.clone();
        }

        info!(investigation_id = %id, "Creating new session");
        let handle = Arc::new(tokio::sync::Mutex::new(Session::new(
            id,
            self.system_prompt.as_str(),
            self.max_history_turns,
        )));
        sessions.insert(id.to_string(), handle.clone());
        handle
    }

    /// Check if a session exists
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// Get the number of sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}
