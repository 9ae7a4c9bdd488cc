//! Persistence and conversation-state seams. Durable storage is an external
//! collaborator; the engine only talks to these traits. `MemoryStore` is the
//! in-process reference implementation.

pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::conversation::ConversationState;
use crate::models::entry::{NewEntry, ScheduleEntry};

#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Undone entries with a timestamp inside `[start, end)`, time-ordered.
    async fn entries_in_range(
        &self,
        user_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<ScheduleEntry>, StoreError>;

    /// Undone recurring entries anchored at or before `until`.
    async fn recurring_entries(
        &self,
        user_id: i64,
        until: NaiveDateTime,
    ) -> Result<Vec<ScheduleEntry>, StoreError>;

    /// Existence check for the idempotency guard: same owner, identical
    /// title and timestamp.
    async fn find_duplicate(
        &self,
        user_id: i64,
        title: &str,
        deadline: NaiveDateTime,
    ) -> Result<Option<ScheduleEntry>, StoreError>;

    /// Any other undone entry at exactly this timestamp.
    async fn find_conflict(
        &self,
        user_id: i64,
        deadline: NaiveDateTime,
    ) -> Result<Option<ScheduleEntry>, StoreError>;

    async fn insert(&self, entry: NewEntry) -> Result<ScheduleEntry, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<ScheduleEntry>, StoreError>;

    /// Historical entries whose title contains `topic` (case-insensitive)
    /// and that carry a concrete timestamp; habit inference input.
    async fn entries_matching_title(
        &self,
        user_id: i64,
        topic: &str,
    ) -> Result<Vec<ScheduleEntry>, StoreError>;
}

/// Conversation histories and pending candidates, keyed by conversation id.
/// Each conversation gets its own lock so read-modify-write sequences are
/// serialized per conversation without blocking unrelated ones.
#[derive(Default)]
pub struct ConversationStore {
    states: Mutex<HashMap<String, Arc<Mutex<ConversationState>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the per-conversation state, created on first use.
    pub async fn state(&self, conversation_id: &str) -> Arc<Mutex<ConversationState>> {
        let mut states = self.states.lock().await;
        states
            .entry(conversation_id.to_string())
            .or_default()
            .clone()
    }

    /// Drops a conversation entirely; pending state goes with it.
    pub async fn end_conversation(&self, conversation_id: &str) {
        let mut states = self.states.lock().await;
        states.remove(conversation_id);
    }
}
