//! Session data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Investigation identifier (see [`crate::subject::investigation_id`])
pub type InvestigationId = String;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One role-tagged message exchanged with the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique ID for this turn
    pub id: String,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }
}

/// Conversation state for one investigation id
///
/// Turns are append-only; the oldest USER/MODEL pairs are dropped once the
/// history exceeds `max_turns`.
#[derive(Debug, Clone)]
pub struct Session {
    id: InvestigationId,
    system_prompt: String,
    turns: Vec<Turn>,
    max_turns: usize,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        id: impl Into<InvestigationId>,
        system_prompt: impl Into<String>,
        max_turns: usize,
    ) -> Self {
        Self {
            id: id.into(),
            system_prompt: system_prompt.into(),
            turns: Vec::new(),
            max_turns: max_turns.max(2),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Journal one request/reply pair
    pub fn record_exchange(&mut self, outgoing: impl Into<String>, incoming: impl Into<String>) {
        self.turns.push(Turn::user(outgoing));
        self.turns.push(Turn::model(incoming));
        self.enforce_cap();
    }

    fn enforce_cap(&mut self) {
        if self.turns.len() <= self.max_turns {
            return;
        }
        let mut excess = self.turns.len() - self.max_turns;
        // Keep USER/MODEL pairs aligned
        if excess % 2 == 1 {
            excess += 1;
        }
        self.turns.drain(..excess.min(self.turns.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_exchange_appends_in_order() {
        let mut session = Session::new("id", "system", 10);
        session.record_exchange("hello", "{}");
        session.record_exchange("results", "{\"status\":\"COMPLETED\"}");

        let roles: Vec<Role> = session.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model, Role::User, Role::Model]);
        assert_eq!(session.turns()[0].text, "hello");
        assert_eq!(session.turns()[3].text, "{\"status\":\"COMPLETED\"}");
    }

    #[test]
    fn test_history_cap_drops_oldest_pairs() {
        let mut session = Session::new("id", "system", 4);
        for i in 0..5 {
            session.record_exchange(format!("q{}", i), format!("a{}", i));
        }
        assert_eq!(session.turns().len(), 4);
        assert_eq!(session.turns()[0].text, "q3");
        assert_eq!(session.turns()[0].role, Role::User);
        assert_eq!(session.turns()[3].text, "a4");
    }

    #[test]
    fn test_odd_cap_keeps_pairs_aligned() {
        let mut session = Session::new("id", "system", 3);
        for i in 0..3 {
            session.record_exchange(format!("q{}", i), format!("a{}", i));
        }
        assert_eq!(session.turns().len(), 2);
        assert_eq!(session.turns()[0].role, Role::User);
    }
}
