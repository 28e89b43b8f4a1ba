//! Runtime wiring helpers for the metered conversation pipeline.

use std::sync::Arc;

use crate::{
    BillingPolicy, CompletionGateway, ConversationStore, CreditLedger, InMemoryConversationStore,
    InMemoryCreditLedger, SessionHooks, SessionOrchestrator,
};

#[derive(Clone)]
pub struct PipelineBundle {
    pub store: Arc<dyn ConversationStore>,
    pub ledger: Arc<dyn CreditLedger>,
    pub orchestrator: SessionOrchestrator,
}

pub fn in_memory_store() -> Arc<dyn ConversationStore> {
    Arc::new(InMemoryConversationStore::new())
}

pub fn in_memory_ledger() -> Arc<dyn CreditLedger> {
    Arc::new(InMemoryCreditLedger::new())
}

pub fn build_pipeline(gateway: Arc<dyn CompletionGateway>) -> PipelineBundle {
    build_pipeline_with(
        gateway,
        in_memory_store(),
        in_memory_ledger(),
        BillingPolicy::default(),
        None,
    )
}

pub fn build_pipeline_with(
    gateway: Arc<dyn CompletionGateway>,
    store: Arc<dyn ConversationStore>,
    ledger: Arc<dyn CreditLedger>,
    billing: BillingPolicy,
    hooks: Option<Arc<dyn SessionHooks>>,
) -> PipelineBundle {
    let mut orchestrator =
        SessionOrchestrator::new(gateway, Arc::clone(&store), Arc::clone(&ledger))
            .with_billing_policy(billing);

    if let Some(hooks) = hooks {
        orchestrator = orchestrator.with_hooks(hooks);
    }

    PipelineBundle {
        store,
        ledger,
        orchestrator,
    }
}
