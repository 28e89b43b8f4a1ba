//! Hook contracts for observing turn orchestration.
//!
//! ```rust
//! use qsession::{NoopSessionHooks, SessionHooks};
//!
//! fn accepts_hooks(_hooks: &dyn SessionHooks) {}
//!
//! let hooks = NoopSessionHooks;
//! accepts_hooks(&hooks);
//! ```

use qcommon::ConversationId;

use crate::{SessionError, SessionPhase, TurnReceipt};

pub trait SessionHooks: Send + Sync {
    fn on_phase_change(&self, _conversation_id: &ConversationId, _phase: SessionPhase) {}

    fn on_fragment_relayed(&self, _conversation_id: &ConversationId, _bytes: usize) {}

    fn on_interruption(&self, _conversation_id: &ConversationId, _message: &str) {}

    fn on_turn_settled(&self, _receipt: &TurnReceipt) {}

    fn on_turn_failed(&self, _conversation_id: &ConversationId, _error: &SessionError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionHooks;

impl SessionHooks for NoopSessionHooks {}
