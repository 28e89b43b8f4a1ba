//! In-memory conversation store, the default test substrate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

use qcommon::{BoxFuture, ConversationId, TurnId, UserId};

use crate::error::StoreError;
use crate::store::{ConversationStore, mint_id};
use crate::types::{Author, Conversation, NewConversation, Turn};

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: Mutex<HashMap<ConversationId, ConversationState>>,
}

#[derive(Debug, Clone)]
struct ConversationState {
    conversation: Conversation,
    turns: Vec<Turn>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<ConversationId, ConversationState>>, StoreError>
    {
        self.conversations
            .lock()
            .map_err(|_| StoreError::storage("conversation store lock poisoned"))
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn create_conversation<'a>(
        &'a self,
        request: NewConversation,
    ) -> BoxFuture<'a, Result<Conversation, StoreError>> {
        Box::pin(async move {
            let mut conversations = self.lock()?;
            let conversation = Conversation {
                id: ConversationId::new(mint_id("conv")),
                owner: request.owner,
                title: request.title,
                metadata: request.metadata,
                created_at: SystemTime::now(),
                deleted_at: None,
            };

            conversations.insert(
                conversation.id.clone(),
                ConversationState {
                    conversation: conversation.clone(),
                    turns: Vec::new(),
                },
            );

            Ok(conversation)
        })
    }

    fn get_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Conversation, StoreError>> {
        Box::pin(async move {
            let conversations = self.lock()?;
            let state = conversations
                .get(conversation_id)
                .filter(|state| !state.conversation.is_deleted())
                .ok_or_else(|| {
                    StoreError::not_found(format!("conversation '{conversation_id}' not found"))
                })?;

            Ok(state.conversation.clone())
        })
    }

    fn list_conversations<'a>(
        &'a self,
        owner: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<Conversation>, StoreError>> {
        Box::pin(async move {
            let conversations = self.lock()?;
            let mut owned = conversations
                .values()
                .filter(|state| {
                    state.conversation.owner == *owner && !state.conversation.is_deleted()
                })
                .map(|state| state.conversation.clone())
                .collect::<Vec<_>>();

            owned.sort_by_key(|conversation| conversation.created_at);
            Ok(owned)
        })
    }

    fn append_turn<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        author: Author,
        text: String,
    ) -> BoxFuture<'a, Result<Turn, StoreError>> {
        Box::pin(async move {
            let mut conversations = self.lock()?;
            let state = conversations
                .get_mut(conversation_id)
                .filter(|state| !state.conversation.is_deleted())
                .ok_or_else(|| {
                    StoreError::not_found(format!("conversation '{conversation_id}' not found"))
                })?;

            let turn = Turn {
                id: TurnId::new(mint_id("turn")),
                conversation_id: conversation_id.clone(),
                author,
                text,
                created_at: SystemTime::now(),
            };

            state.turns.push(turn.clone());
            Ok(turn)
        })
    }

    fn list_turns<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Vec<Turn>, StoreError>> {
        Box::pin(async move {
            let conversations = self.lock()?;
            let state = conversations
                .get(conversation_id)
                .filter(|state| !state.conversation.is_deleted())
                .ok_or_else(|| {
                    StoreError::not_found(format!("conversation '{conversation_id}' not found"))
                })?;

            Ok(state.turns.clone())
        })
    }

    fn list_turns_including_deleted<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Vec<Turn>, StoreError>> {
        Box::pin(async move {
            let conversations = self.lock()?;
            let state = conversations.get(conversation_id).ok_or_else(|| {
                StoreError::not_found(format!("conversation '{conversation_id}' not found"))
            })?;

            Ok(state.turns.clone())
        })
    }

    fn soft_delete<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut conversations = self.lock()?;
            let state = conversations.get_mut(conversation_id).ok_or_else(|| {
                StoreError::not_found(format!("conversation '{conversation_id}' not found"))
            })?;

            if state.conversation.deleted_at.is_none() {
                state.conversation.deleted_at = Some(SystemTime::now());
            }

            Ok(())
        })
    }
}
