//! Metered streaming turn orchestration over a completion gateway, a
//! conversation store, and a credit ledger.

mod error;
mod hooks;
mod locks;
mod orchestrator;
mod types;

pub mod prelude {
    pub use crate::{
        BillingPolicy, ConversationRequest, GenerationOptions, NoopSessionHooks, SessionError,
        SessionErrorKind, SessionEvent, SessionEventStream, SessionHooks, SessionOrchestrator,
        SessionPhase, TurnReceipt, TurnRequest,
    };
    pub use qcommon::{ConversationId, MetadataMap, TurnId, UserId};
}

pub use error::{SessionError, SessionErrorKind};
pub use hooks::{NoopSessionHooks, SessionHooks};
pub use orchestrator::SessionOrchestrator;
pub use types::{
    BillingPolicy, ConversationRequest, GenerationOptions, SessionEvent, SessionEventStream,
    SessionPhase, TurnReceipt, TurnRequest,
};
