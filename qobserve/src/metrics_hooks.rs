//! Metrics-based observability hooks for gateway calls and session turns.
//!
//! ```rust
//! use qgateway::GatewayOperationHooks;
//! use qobserve::MetricsObservabilityHooks;
//!
//! fn accepts_gateway_hooks(_hooks: &dyn GatewayOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_gateway_hooks(&hooks);
//! ```

use std::time::Duration;

use qcommon::ConversationId;
use qgateway::{GatewayError, GatewayId, GatewayOperationHooks};
use qsession::{SessionError, SessionHooks, SessionPhase, TurnReceipt};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl GatewayOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, gateway: GatewayId, operation: &str, _attempt: u32) {
        metrics::counter!(
            "quill_gateway_attempt_start_total",
            "gateway" => gateway.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        gateway: GatewayId,
        operation: &str,
        _attempt: u32,
        delay: Duration,
        error: &GatewayError,
    ) {
        metrics::counter!(
            "quill_gateway_retry_scheduled_total",
            "gateway" => gateway.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "quill_gateway_retry_delay_seconds",
            "gateway" => gateway.to_string(),
            "operation" => operation.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_success(&self, gateway: GatewayId, operation: &str, attempts: u32) {
        metrics::counter!(
            "quill_gateway_success_total",
            "gateway" => gateway.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "quill_gateway_attempts_per_success",
            "gateway" => gateway.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }

    fn on_failure(&self, gateway: GatewayId, operation: &str, attempts: u32, error: &GatewayError) {
        metrics::counter!(
            "quill_gateway_failure_total",
            "gateway" => gateway.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "quill_gateway_attempts_per_failure",
            "gateway" => gateway.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }
}

impl SessionHooks for MetricsObservabilityHooks {
    fn on_phase_change(&self, _conversation_id: &ConversationId, phase: SessionPhase) {
        metrics::counter!(
            "quill_session_phase_change_total",
            "phase" => format!("{:?}", phase)
        )
        .increment(1);
    }

    fn on_fragment_relayed(&self, _conversation_id: &ConversationId, bytes: usize) {
        metrics::counter!("quill_session_fragments_relayed_total").increment(1);
        metrics::counter!("quill_session_fragment_bytes_total").increment(bytes as u64);
    }

    fn on_interruption(&self, _conversation_id: &ConversationId, _message: &str) {
        metrics::counter!("quill_session_interruptions_total").increment(1);
    }

    fn on_turn_settled(&self, receipt: &TurnReceipt) {
        metrics::counter!(
            "quill_session_turns_settled_total",
            "interrupted" => receipt.interrupted.to_string()
        )
        .increment(1);
        metrics::histogram!("quill_session_usage_units").record(receipt.usage_units as f64);
        metrics::histogram!("quill_session_credits_charged").record(receipt.credits_charged as f64);
    }

    fn on_turn_failed(&self, _conversation_id: &ConversationId, error: &SessionError) {
        metrics::counter!(
            "quill_session_turns_failed_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }
}
