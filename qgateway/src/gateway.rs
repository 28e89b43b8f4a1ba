//! Completion gateway trait.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{BoxedFragmentStream, CompletionRequest, GatewayError};

pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayId {
    OpenAiCompat,
    Scripted,
}

impl Display for GatewayId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let id = match self {
            Self::OpenAiCompat => "openai-compat",
            Self::Scripted => "scripted",
        };

        f.write_str(id)
    }
}

/// Pure adapter over an external completion provider. Performs no
/// persistence and knows nothing about credits.
pub trait CompletionGateway: Send + Sync {
    fn id(&self) -> GatewayId;

    /// Open an incremental generation stream for the given prior turns.
    ///
    /// A failure here means nothing was generated (`Unavailable` and
    /// friends); once the returned stream has yielded a fragment, any later
    /// stream error is an interruption and the caller owns the partial
    /// output already shown.
    fn stream_completion<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> GatewayFuture<'a, Result<BoxedFragmentStream<'a>, GatewayError>>;
}

impl std::fmt::Debug for dyn CompletionGateway {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGateway")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}
