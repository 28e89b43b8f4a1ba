//! Conversation store trait, backend configuration, and id minting.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use qcommon::{BoxFuture, ConversationId, UserId};

use crate::backends::sqlite::default_sqlite_path;
use crate::error::StoreError;
use crate::types::{Author, Conversation, NewConversation, Turn};

pub use crate::backends::memory::InMemoryConversationStore;
pub use crate::backends::sqlite::SqliteConversationStore;

/// Durable record of conversations and their ordered turns.
///
/// `append_turn` guarantees strictly increasing order for turns of one
/// conversation under the session layer's one-outstanding-append-per-
/// conversation discipline; backends additionally serialize writes on their
/// own lock.
pub trait ConversationStore: Send + Sync {
    fn create_conversation<'a>(
        &'a self,
        request: NewConversation,
    ) -> BoxFuture<'a, Result<Conversation, StoreError>>;

    /// `NotFound` if the conversation does not exist or is soft-deleted.
    fn get_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Conversation, StoreError>>;

    fn list_conversations<'a>(
        &'a self,
        owner: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<Conversation>, StoreError>>;

    /// Appends after the current last turn. `NotFound` if the conversation
    /// is missing or soft-deleted.
    fn append_turn<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        author: Author,
        text: String,
    ) -> BoxFuture<'a, Result<Turn, StoreError>>;

    /// Chronological, re-queryable. `NotFound` once the conversation is
    /// soft-deleted; history then remains reachable only through
    /// [`ConversationStore::list_turns_including_deleted`].
    fn list_turns<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Vec<Turn>, StoreError>>;

    /// Explicit audit path: returns historical turns even after the parent
    /// conversation was soft-deleted.
    fn list_turns_including_deleted<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Vec<Turn>, StoreError>>;

    /// Idempotent tombstone; subsequent reads and appends behave as
    /// `NotFound`.
    fn soft_delete<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Sqlite { path: PathBuf },
    InMemory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

pub fn create_conversation_store(
    config: StoreConfig,
) -> Result<Arc<dyn ConversationStore>, StoreError> {
    match config {
        StoreConfig::Sqlite { path } => Ok(Arc::new(SqliteConversationStore::new(path)?)),
        StoreConfig::InMemory => Ok(Arc::new(InMemoryConversationStore::new())),
    }
}

pub fn create_default_conversation_store() -> Result<Arc<dyn ConversationStore>, StoreError> {
    create_conversation_store(StoreConfig::default())
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Mints an opaque prefixed id. Epoch nanos plus a process-local counter
/// keeps ids unique within a store and sortable enough for humans; ordering
/// authority stays with the backend sequence, never the id.
pub(crate) fn mint_id(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{nanos:x}-{counter:x}")
}
