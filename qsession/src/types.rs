//! Turn request, receipt, and session event types.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use qcommon::{ConversationId, MetadataMap, TurnId, UserId};
use qgateway::StopCause;
use tokio::sync::mpsc::Receiver;

use crate::SessionError;

/// Model parameters for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    pub user: UserId,
    pub conversation_id: ConversationId,
    pub user_input: String,
    pub options: GenerationOptions,
}

impl TurnRequest {
    pub fn new(
        user: UserId,
        conversation_id: ConversationId,
        user_input: impl Into<String>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            user,
            conversation_id,
            user_input: user_input.into(),
            options,
        }
    }
}

/// Opens a conversation and streams its first reply in one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationRequest {
    pub user: UserId,
    pub title: String,
    pub metadata: MetadataMap,
    pub user_input: String,
    pub options: GenerationOptions,
}

impl ConversationRequest {
    pub fn new(
        user: UserId,
        title: impl Into<String>,
        user_input: impl Into<String>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            user,
            title: title.into(),
            metadata: MetadataMap::new(),
            user_input: user_input.into(),
            options,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// How usage converts to a credit charge when the gateway summary is
/// incomplete. A summary with no usage metadata bills
/// `fallback_usage_units`; a stream that never delivered a summary bills
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPolicy {
    pub fallback_usage_units: u64,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            fallback_usage_units: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Validating,
    Streaming,
    Settling,
}

/// Terminal accounting record for one completed or interrupted turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReceipt {
    pub conversation_id: ConversationId,
    pub user_turn_id: TurnId,
    /// `None` when the generation produced no assistant text at all.
    pub assistant_turn_id: Option<TurnId>,
    pub stop: Option<StopCause>,
    pub usage_units: u64,
    pub credits_charged: u64,
    pub balance_remaining: u64,
    /// The stream broke before ending cleanly. When the usage summary had
    /// already arrived, `usage_units` still reflects the full reported
    /// amount rather than the partial text.
    pub interrupted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One relayed text delta, forwarded before the full reply is known.
    Fragment(String),
    /// The generation broke mid-stream; partial output up to this point has
    /// been persisted and a receipt still follows.
    Interrupted(String),
    /// Terminal milestone; no further events follow.
    TurnComplete(TurnReceipt),
}

/// Caller-facing event sequence for one turn. Dropping the stream does not
/// cancel the turn: the orchestrator keeps draining the gateway, persists
/// what was generated, and settles the charge.
#[derive(Debug)]
pub struct SessionEventStream {
    receiver: Receiver<Result<SessionEvent, SessionError>>,
}

impl SessionEventStream {
    pub(crate) fn new(receiver: Receiver<Result<SessionEvent, SessionError>>) -> Self {
        Self { receiver }
    }
}

impl Stream for SessionEventStream {
    type Item = Result<SessionEvent, SessionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
