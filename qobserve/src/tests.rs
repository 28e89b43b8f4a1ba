use std::sync::{Arc, Mutex};
use std::time::Duration;

use qcommon::{ConversationId, TurnId};
use qgateway::{GatewayError, GatewayId, GatewayOperationHooks, StopCause};
use qsession::{SessionError, SessionHooks, SessionPhase, TurnReceipt};

use crate::{
    MetricsObservabilityHooks, SafeGatewayHooks, SafeSessionHooks, TracingObservabilityHooks,
};

fn sample_receipt() -> TurnReceipt {
    TurnReceipt {
        conversation_id: ConversationId::from("conv-1"),
        user_turn_id: TurnId::from("turn-1"),
        assistant_turn_id: Some(TurnId::from("turn-2")),
        stop: Some(StopCause::EndTurn),
        usage_units: 12,
        credits_charged: 12,
        balance_remaining: 38,
        interrupted: false,
    }
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    let hooks = TracingObservabilityHooks;
    let gateway_error = GatewayError::timeout("gateway timeout");
    let session_error = SessionError::gateway("generation failed");
    let conversation_id = ConversationId::from("conv-1");

    hooks.on_attempt_start(GatewayId::OpenAiCompat, "stream_completion", 1);
    hooks.on_retry_scheduled(
        GatewayId::OpenAiCompat,
        "stream_completion",
        1,
        Duration::from_millis(10),
        &gateway_error,
    );
    hooks.on_success(GatewayId::OpenAiCompat, "stream_completion", 2);
    hooks.on_failure(GatewayId::OpenAiCompat, "stream_completion", 2, &gateway_error);

    hooks.on_phase_change(&conversation_id, SessionPhase::Validating);
    hooks.on_fragment_relayed(&conversation_id, 48);
    hooks.on_interruption(&conversation_id, "connection reset");
    hooks.on_turn_settled(&sample_receipt());
    hooks.on_turn_failed(&conversation_id, &session_error);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    let hooks = MetricsObservabilityHooks;
    let gateway_error = GatewayError::timeout("gateway timeout");
    let session_error = SessionError::gateway("generation failed");
    let conversation_id = ConversationId::from("conv-1");

    hooks.on_attempt_start(GatewayId::OpenAiCompat, "stream_completion", 1);
    hooks.on_retry_scheduled(
        GatewayId::OpenAiCompat,
        "stream_completion",
        1,
        Duration::from_millis(10),
        &gateway_error,
    );
    hooks.on_success(GatewayId::OpenAiCompat, "stream_completion", 2);
    hooks.on_failure(GatewayId::OpenAiCompat, "stream_completion", 2, &gateway_error);

    hooks.on_phase_change(&conversation_id, SessionPhase::Streaming);
    hooks.on_fragment_relayed(&conversation_id, 48);
    hooks.on_interruption(&conversation_id, "connection reset");
    hooks.on_turn_settled(&sample_receipt());
    hooks.on_turn_failed(&conversation_id, &session_error);
}

#[derive(Default, Clone)]
struct RecordingGatewayHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl GatewayOperationHooks for RecordingGatewayHooks {
    fn on_attempt_start(&self, _gateway: GatewayId, _operation: &str, _attempt: u32) {
        self.events
            .lock()
            .expect("events lock")
            .push("attempt_start");
    }

    fn on_retry_scheduled(
        &self,
        _gateway: GatewayId,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &GatewayError,
    ) {
        self.events
            .lock()
            .expect("events lock")
            .push("retry_scheduled");
    }

    fn on_success(&self, _gateway: GatewayId, _operation: &str, _attempts: u32) {
        self.events.lock().expect("events lock").push("success");
    }

    fn on_failure(
        &self,
        _gateway: GatewayId,
        _operation: &str,
        _attempts: u32,
        _error: &GatewayError,
    ) {
        self.events.lock().expect("events lock").push("failure");
    }
}

#[derive(Default, Clone)]
struct RecordingSessionHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl SessionHooks for RecordingSessionHooks {
    fn on_phase_change(&self, _conversation_id: &ConversationId, _phase: SessionPhase) {
        self.events.lock().expect("events lock").push("phase_change");
    }

    fn on_fragment_relayed(&self, _conversation_id: &ConversationId, _bytes: usize) {
        self.events.lock().expect("events lock").push("fragment");
    }

    fn on_interruption(&self, _conversation_id: &ConversationId, _message: &str) {
        self.events.lock().expect("events lock").push("interruption");
    }

    fn on_turn_settled(&self, _receipt: &TurnReceipt) {
        self.events.lock().expect("events lock").push("settled");
    }

    fn on_turn_failed(&self, _conversation_id: &ConversationId, _error: &SessionError) {
        self.events.lock().expect("events lock").push("failed");
    }
}

struct PanicGatewayHooks;

impl GatewayOperationHooks for PanicGatewayHooks {
    fn on_attempt_start(&self, _gateway: GatewayId, _operation: &str, _attempt: u32) {
        panic!("attempt_start panic");
    }

    fn on_retry_scheduled(
        &self,
        _gateway: GatewayId,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &GatewayError,
    ) {
        panic!("retry_scheduled panic");
    }

    fn on_success(&self, _gateway: GatewayId, _operation: &str, _attempts: u32) {
        panic!("success panic");
    }

    fn on_failure(
        &self,
        _gateway: GatewayId,
        _operation: &str,
        _attempts: u32,
        _error: &GatewayError,
    ) {
        panic!("failure panic");
    }
}

struct PanicSessionHooks;

impl SessionHooks for PanicSessionHooks {
    fn on_phase_change(&self, _conversation_id: &ConversationId, _phase: SessionPhase) {
        panic!("phase_change panic");
    }

    fn on_fragment_relayed(&self, _conversation_id: &ConversationId, _bytes: usize) {
        panic!("fragment panic");
    }

    fn on_interruption(&self, _conversation_id: &ConversationId, _message: &str) {
        panic!("interruption panic");
    }

    fn on_turn_settled(&self, _receipt: &TurnReceipt) {
        panic!("settled panic");
    }

    fn on_turn_failed(&self, _conversation_id: &ConversationId, _error: &SessionError) {
        panic!("failed panic");
    }
}

#[test]
fn safe_gateway_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingGatewayHooks::default();
    let events = Arc::clone(&inner.events);
    let hooks = SafeGatewayHooks::new(inner);
    let gateway_error = GatewayError::timeout("gateway timeout");

    hooks.on_attempt_start(GatewayId::OpenAiCompat, "stream_completion", 1);
    hooks.on_retry_scheduled(
        GatewayId::OpenAiCompat,
        "stream_completion",
        1,
        Duration::from_millis(10),
        &gateway_error,
    );
    hooks.on_success(GatewayId::OpenAiCompat, "stream_completion", 2);
    hooks.on_failure(GatewayId::OpenAiCompat, "stream_completion", 2, &gateway_error);

    assert_eq!(events.lock().expect("events lock").len(), 4);
}

#[test]
fn safe_session_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingSessionHooks::default();
    let events = Arc::clone(&inner.events);
    let hooks = SafeSessionHooks::new(inner);
    let conversation_id = ConversationId::from("conv-1");
    let session_error = SessionError::gateway("generation failed");

    hooks.on_phase_change(&conversation_id, SessionPhase::Settling);
    hooks.on_fragment_relayed(&conversation_id, 16);
    hooks.on_interruption(&conversation_id, "connection reset");
    hooks.on_turn_settled(&sample_receipt());
    hooks.on_turn_failed(&conversation_id, &session_error);

    assert_eq!(events.lock().expect("events lock").len(), 5);
}

#[test]
fn safe_gateway_hooks_swallow_panics() {
    let hooks = SafeGatewayHooks::new(PanicGatewayHooks);
    let gateway_error = GatewayError::timeout("gateway timeout");

    hooks.on_attempt_start(GatewayId::OpenAiCompat, "stream_completion", 1);
    hooks.on_retry_scheduled(
        GatewayId::OpenAiCompat,
        "stream_completion",
        1,
        Duration::from_millis(10),
        &gateway_error,
    );
    hooks.on_success(GatewayId::OpenAiCompat, "stream_completion", 2);
    hooks.on_failure(GatewayId::OpenAiCompat, "stream_completion", 2, &gateway_error);
}

#[test]
fn safe_session_hooks_swallow_panics() {
    let hooks = SafeSessionHooks::new(PanicSessionHooks);
    let conversation_id = ConversationId::from("conv-1");
    let session_error = SessionError::gateway("generation failed");

    hooks.on_phase_change(&conversation_id, SessionPhase::Validating);
    hooks.on_fragment_relayed(&conversation_id, 16);
    hooks.on_interruption(&conversation_id, "connection reset");
    hooks.on_turn_settled(&sample_receipt());
    hooks.on_turn_failed(&conversation_id, &session_error);
}
