//! Conversation sessions and the investigation loop
//!
//! - `types`: role-tagged turns and the per-id session journal
//! - `store`: process-wide map from investigation id to session
//! - `driver`: the bounded request/decode/dispatch loop

mod driver;
mod store;
mod types;

pub use driver::{InvestigationDriver, MAX_ITERATIONS};
pub use store::{SessionHandle, SessionStore, DEFAULT_MAX_HISTORY_TURNS};
pub use types::{InvestigationId, Role, Session, Turn};
