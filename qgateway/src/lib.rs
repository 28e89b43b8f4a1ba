//! Completion gateway contracts for the quill conversation pipeline.
//!
//! A gateway turns a list of prior role-tagged turns into a lazy, finite,
//! forward-only stream of text fragments terminated by a usage summary. It
//! performs no persistence and knows nothing about credits; metering and
//! settlement live in the session layer.

mod error;
mod gateway;
mod request;
mod resilience;
mod stream;

pub mod adapters;

pub mod prelude {
    pub use crate::{
        BoxedFragmentStream, CompletionEvent, CompletionGateway, CompletionRequest,
        CompletionSummary, FragmentStream, GatewayError, GatewayErrorKind, GatewayFuture,
        GatewayId, GatewayOperationHooks, GenerationUsage, NoopGatewayHooks, OpenAiCompatGateway,
        PromptMessage, RetryPolicy, Role, StopCause, VecFragmentStream,
    };
    pub use qcommon::{BoxFuture, MetadataMap};
}

pub use adapters::OpenAiCompatGateway;
pub use error::{GatewayError, GatewayErrorKind};
pub use gateway::{CompletionGateway, GatewayFuture, GatewayId};
pub use request::{CompletionRequest, PromptMessage, Role};
pub use resilience::{GatewayOperationHooks, NoopGatewayHooks, RetryPolicy};
pub use stream::{
    BoxedFragmentStream, CompletionEvent, CompletionSummary, FragmentStream, GenerationUsage,
    StopCause, VecFragmentStream,
};
