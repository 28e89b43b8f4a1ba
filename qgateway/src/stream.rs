//! Streaming completion event contracts and in-memory stream utilities.
//!
//! ```rust
//! use qgateway::{BoxedFragmentStream, CompletionEvent, VecFragmentStream};
//!
//! let stream = VecFragmentStream::new(vec![Ok(CompletionEvent::Fragment("hello".into()))]);
//! let _boxed: BoxedFragmentStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::GatewayError;

/// Total consumed units for one completion call. Used purely to compute the
/// credit debit and discarded after settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationUsage {
    pub units: u64,
}

impl GenerationUsage {
    pub fn new(units: u64) -> Self {
        Self { units }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    EndTurn,
    MaxTokens,
    Cancelled,
    Other,
}

/// Terminal element of a completion stream. `usage` is `None` when the
/// provider omitted usage metadata; billing then falls back to a configured
/// default amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionSummary {
    pub usage: Option<GenerationUsage>,
    pub stop: StopCause,
}

impl CompletionSummary {
    pub fn new(usage: Option<GenerationUsage>, stop: StopCause) -> Self {
        Self { usage, stop }
    }

    pub fn with_units(units: u64) -> Self {
        Self::new(Some(GenerationUsage::new(units)), StopCause::EndTurn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    /// One incremental text delta, delivered before the full reply is known.
    Fragment(String),
    /// Terminal milestone carrying the usage summary for the whole call.
    Completed(CompletionSummary),
}

/// Gateway stream contract.
///
/// Invariants for consumers:
/// - Events are emitted in source order.
/// - `Fragment` may appear zero or more times.
/// - `Completed`, when present, is the final event; a stream that ends (or
///   errors) without it delivered no usage summary.
/// - The sequence is finite, forward-only, and not restartable; re-invoking
///   the gateway performs a new, independently-billed generation.
/// - Once the stream yields `None`, it must not yield additional items.
pub trait FragmentStream: Stream<Item = Result<CompletionEvent, GatewayError>> + Send {}

impl<T> FragmentStream for T where T: Stream<Item = Result<CompletionEvent, GatewayError>> + Send {}

pub type BoxedFragmentStream<'a> = Pin<Box<dyn FragmentStream + 'a>>;

impl std::fmt::Debug for dyn FragmentStream + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStream").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct VecFragmentStream {
    events: VecDeque<Result<CompletionEvent, GatewayError>>,
}

impl VecFragmentStream {
    pub fn new(events: Vec<Result<CompletionEvent, GatewayError>>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl Stream for VecFragmentStream {
    type Item = Result<CompletionEvent, GatewayError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<CompletionEvent, GatewayError>>> {
        Poll::Ready(self.events.pop_front())
    }
}
