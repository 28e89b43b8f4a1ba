//! Unified facade over the Quill workspace crates.
//!
//! This crate is designed to be the single dependency for most applications.
//! It re-exports the core quill crates and provides convenience helpers for
//! wiring a gateway, store, and ledger into a session orchestrator.

pub mod gateways;
pub mod prelude;
pub mod runtime;

pub use qcommon;
pub use qgateway;
pub use qledger;
pub use qobserve;
pub use qsession;
pub use qstore;

pub use qcommon::{BoxFuture, ConversationId, MetadataMap, TurnId, UserId};
pub use qgateway::{
    BoxedFragmentStream, CompletionEvent, CompletionGateway, CompletionRequest, CompletionSummary,
    FragmentStream, GatewayError, GatewayErrorKind, GatewayFuture, GatewayId,
    GatewayOperationHooks, GenerationUsage, NoopGatewayHooks, OpenAiCompatGateway, PromptMessage,
    RetryPolicy, Role, StopCause, VecFragmentStream,
};
pub use qledger::{
    CreditLedger, InMemoryCreditLedger, LedgerConfig, LedgerError, LedgerErrorKind, SettledDebit,
    SqliteCreditLedger, create_credit_ledger, create_default_credit_ledger,
};
pub use qobserve::{
    MetricsObservabilityHooks, SafeGatewayHooks, SafeSessionHooks, TracingObservabilityHooks,
};
pub use qsession::{
    BillingPolicy, ConversationRequest, GenerationOptions, NoopSessionHooks, SessionError,
    SessionErrorKind, SessionEvent, SessionEventStream, SessionHooks, SessionOrchestrator,
    SessionPhase, TurnReceipt, TurnRequest,
};
pub use qstore::{
    Author, Conversation, ConversationStore, InMemoryConversationStore, NewConversation,
    SqliteConversationStore, StoreConfig, StoreError, StoreErrorKind, Turn,
    create_conversation_store, create_default_conversation_store,
};

pub use gateways::{GatewayBuildConfig, build_gateway_from_api_key, build_gateway_with_config};
pub use runtime::{PipelineBundle, build_pipeline, build_pipeline_with, in_memory_ledger, in_memory_store};
