//! Tracing-based observability hooks for gateway calls and session turns.
//!
//! ```rust
//! use qobserve::TracingObservabilityHooks;
//! use qsession::SessionHooks;
//!
//! fn accepts_session_hooks(_hooks: &dyn SessionHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_session_hooks(&hooks);
//! ```

use std::time::Duration;

use qcommon::ConversationId;
use qgateway::{GatewayError, GatewayId, GatewayOperationHooks};
use qsession::{SessionError, SessionHooks, SessionPhase, TurnReceipt};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl GatewayOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, gateway: GatewayId, operation: &str, attempt: u32) {
        tracing::info!(
            phase = "gateway",
            event = "attempt_start",
            gateway = %gateway,
            operation,
            attempt
        );
    }

    fn on_retry_scheduled(
        &self,
        gateway: GatewayId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &GatewayError,
    ) {
        tracing::warn!(
            phase = "gateway",
            event = "retry_scheduled",
            gateway = %gateway,
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_success(&self, gateway: GatewayId, operation: &str, attempts: u32) {
        tracing::info!(
            phase = "gateway",
            event = "success",
            gateway = %gateway,
            operation,
            attempts
        );
    }

    fn on_failure(&self, gateway: GatewayId, operation: &str, attempts: u32, error: &GatewayError) {
        tracing::error!(
            phase = "gateway",
            event = "failure",
            gateway = %gateway,
            operation,
            attempts,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }
}

impl SessionHooks for TracingObservabilityHooks {
    fn on_phase_change(&self, conversation_id: &ConversationId, phase: SessionPhase) {
        tracing::info!(
            phase = "session",
            event = "phase_change",
            conversation_id = %conversation_id,
            session_phase = ?phase
        );
    }

    fn on_fragment_relayed(&self, conversation_id: &ConversationId, bytes: usize) {
        tracing::debug!(
            phase = "session",
            event = "fragment_relayed",
            conversation_id = %conversation_id,
            bytes
        );
    }

    fn on_interruption(&self, conversation_id: &ConversationId, message: &str) {
        tracing::warn!(
            phase = "session",
            event = "interruption",
            conversation_id = %conversation_id,
            message
        );
    }

    fn on_turn_settled(&self, receipt: &TurnReceipt) {
        tracing::info!(
            phase = "session",
            event = "turn_settled",
            conversation_id = %receipt.conversation_id,
            usage_units = receipt.usage_units,
            credits_charged = receipt.credits_charged,
            balance_remaining = receipt.balance_remaining,
            interrupted = receipt.interrupted
        );
    }

    fn on_turn_failed(&self, conversation_id: &ConversationId, error: &SessionError) {
        tracing::error!(
            phase = "session",
            event = "turn_failed",
            conversation_id = %conversation_id,
            error_kind = ?error.kind,
            error = %error
        );
    }
}
