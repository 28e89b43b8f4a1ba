use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use qcommon::ConversationId;
use qgateway::{GatewayError, GatewayId, GatewayOperationHooks};
use qsession::{SessionError, SessionHooks, SessionPhase, TurnReceipt};

pub struct SafeGatewayHooks<H> {
    inner: H,
}

impl<H> SafeGatewayHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> GatewayOperationHooks for SafeGatewayHooks<H>
where
    H: GatewayOperationHooks,
{
    fn on_attempt_start(&self, gateway: GatewayId, operation: &str, attempt: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_start(gateway, operation, attempt)
        }));
    }

    fn on_retry_scheduled(
        &self,
        gateway: GatewayId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &GatewayError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_retry_scheduled(gateway, operation, attempt, delay, error)
        }));
    }

    fn on_success(&self, gateway: GatewayId, operation: &str, attempts: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(gateway, operation, attempts)
        }));
    }

    fn on_failure(&self, gateway: GatewayId, operation: &str, attempts: u32, error: &GatewayError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(gateway, operation, attempts, error)
        }));
    }
}

pub struct SafeSessionHooks<H> {
    inner: H,
}

impl<H> SafeSessionHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> SessionHooks for SafeSessionHooks<H>
where
    H: SessionHooks,
{
    fn on_phase_change(&self, conversation_id: &ConversationId, phase: SessionPhase) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_phase_change(conversation_id, phase)
        }));
    }

    fn on_fragment_relayed(&self, conversation_id: &ConversationId, bytes: usize) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_fragment_relayed(conversation_id, bytes)
        }));
    }

    fn on_interruption(&self, conversation_id: &ConversationId, message: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_interruption(conversation_id, message)
        }));
    }

    fn on_turn_settled(&self, receipt: &TurnReceipt) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_turn_settled(receipt)));
    }

    fn on_turn_failed(&self, conversation_id: &ConversationId, error: &SessionError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_failed(conversation_id, error)
        }));
    }
}
