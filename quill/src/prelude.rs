//! Common imports for most Quill applications.

pub use crate::{
    GatewayBuildConfig, PipelineBundle, build_gateway_from_api_key, build_gateway_with_config,
    build_pipeline, build_pipeline_with, in_memory_ledger, in_memory_store,
};
pub use crate::{
    Author, BillingPolicy, BoxFuture, BoxedFragmentStream, CompletionEvent, CompletionGateway,
    CompletionRequest, CompletionSummary, Conversation, ConversationId, ConversationRequest,
    ConversationStore, CreditLedger, GatewayError, GatewayErrorKind, GatewayId, GenerationOptions, GenerationUsage,
    InMemoryConversationStore, InMemoryCreditLedger, LedgerError, LedgerErrorKind, MetadataMap,
    NewConversation, OpenAiCompatGateway, PromptMessage, Role, SessionError, SessionErrorKind,
    SessionEvent, SessionEventStream, SessionHooks, SessionOrchestrator, SettledDebit,
    SqliteConversationStore, SqliteCreditLedger, StopCause, StoreError, StoreErrorKind, Turn,
    TurnId, TurnReceipt, TurnRequest, UserId,
};
pub use qobserve::{MetricsObservabilityHooks, TracingObservabilityHooks};
