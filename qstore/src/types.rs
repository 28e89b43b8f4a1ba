//! Conversation and turn record types.

use std::time::SystemTime;

use qcommon::{ConversationId, MetadataMap, TurnId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

/// A durable conversation record. The owner is immutable after creation;
/// soft deletion tombstones the record without removing history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub owner: UserId,
    pub title: String,
    pub metadata: MetadataMap,
    pub created_at: SystemTime,
    pub deleted_at: Option<SystemTime>,
}

impl Conversation {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// One message within a conversation, immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: TurnId,
    pub conversation_id: ConversationId,
    pub author: Author,
    pub text: String,
    pub created_at: SystemTime,
}

/// Creation input for a conversation; the store mints the id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    pub owner: UserId,
    pub title: String,
    pub metadata: MetadataMap,
}

impl NewConversation {
    pub fn new(owner: UserId, title: impl Into<String>) -> Self {
        Self {
            owner,
            title: title.into(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
