//! Conversation and turn persistence for the quill conversation pipeline.
//!
//! Conversations are append-only per the session layer's serialization
//! discipline and soft-deletable; turn history survives deletion behind an
//! explicit audit path.

mod backends;
mod error;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        Author, Conversation, ConversationStore, InMemoryConversationStore, NewConversation,
        SqliteConversationStore, StoreConfig, StoreError, StoreErrorKind, Turn,
        create_conversation_store, create_default_conversation_store,
    };
    pub use qcommon::{ConversationId, MetadataMap, TurnId, UserId};
}

pub use error::{StoreError, StoreErrorKind};
pub use store::{
    ConversationStore, InMemoryConversationStore, SqliteConversationStore, StoreConfig,
    create_conversation_store, create_default_conversation_store,
};
pub use types::{Author, Conversation, NewConversation, Turn};
