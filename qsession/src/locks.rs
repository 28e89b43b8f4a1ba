//! Per-conversation mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use qcommon::ConversationId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::SessionError;

/// Hands out one async mutex per conversation. At most one turn runs per
/// conversation; turns on different conversations proceed independently.
/// A second `send_turn` on the same conversation queues behind the first
/// rather than failing.
#[derive(Debug, Default)]
pub(crate) struct ConversationLocks {
    inner: Mutex<HashMap<ConversationId, Arc<AsyncMutex<()>>>>,
}

impl ConversationLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The returned guard is owned so it can travel into the task that
    /// drives the turn and release only when settlement finishes.
    pub(crate) async fn acquire(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<OwnedMutexGuard<()>, SessionError> {
        let lock = {
            let mut map = self
                .inner
                .lock()
                .map_err(|_| SessionError::storage("conversation lock map poisoned"))?;
            Arc::clone(map.entry(conversation_id.clone()).or_default())
        };

        Ok(lock.lock_owned().await)
    }
}
