use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::entry::{NewEntry, ScheduleEntry};
use crate::store::EntryStore;

#[derive(Default)]
struct Inner {
    next_id: i64,
    entries: Vec<ScheduleEntry>,
}

/// In-memory entry store. The durable backend is an external collaborator;
/// this implementation backs the cli mode and the test suites.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload entries, assigning ids; test and cli setup helper.
    pub async fn seed(&self, entries: Vec<NewEntry>) -> Result<Vec<ScheduleEntry>, StoreError> {
        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            created.push(self.insert(entry).await?);
        }
        Ok(created)
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn entries_in_range(
        &self,
        user_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        let inner = self.inner.lock().await;
        let mut found: Vec<ScheduleEntry> = inner
            .entries
            .iter()
            .filter(|e| {
                e.user_id == user_id
                    && !e.done
                    && e.deadline.is_some_and(|d| d >= start && d < end)
            })
            .cloned()
            .collect();
        found.sort_by_key(|e| e.deadline);
        Ok(found)
    }

    async fn recurring_entries(
        &self,
        user_id: i64,
        until: NaiveDateTime,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| {
                e.user_id == user_id
                    && !e.done
                    && e.recurrence.is_some()
                    && e.deadline.is_some_and(|d| d <= until)
            })
            .cloned()
            .collect())
    }

    async fn find_duplicate(
        &self,
        user_id: i64,
        title: &str,
        deadline: NaiveDateTime,
    ) -> Result<Option<ScheduleEntry>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .entries
            .iter()
            .find(|e| e.user_id == user_id && e.title == title && e.deadline == Some(deadline))
            .cloned())
    }

    async fn find_conflict(
        &self,
        user_id: i64,
        deadline: NaiveDateTime,
    ) -> Result<Option<ScheduleEntry>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .entries
            .iter()
            .find(|e| e.user_id == user_id && !e.done && e.deadline == Some(deadline))
            .cloned())
    }

    async fn insert(&self, entry: NewEntry) -> Result<ScheduleEntry, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let stored = ScheduleEntry {
            id: inner.next_id,
            title: entry.title,
            description: entry.description,
            deadline: Some(entry.deadline),
            priority: entry.priority,
            recurrence: entry.recurrence,
            recurrence_end: entry.recurrence_end,
            color: entry.color,
            done: false,
            user_id: entry.user_id,
        };
        inner.entries.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> Result<Option<ScheduleEntry>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.entries.iter().find(|e| e.id == id).cloned())
    }

    async fn entries_matching_title(
        &self,
        user_id: i64,
        topic: &str,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        let topic_lower = topic.to_lowercase();
        let inner = self.inner.lock().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| {
                e.user_id == user_id
                    && e.deadline.is_some()
                    && e.title.to_lowercase().contains(&topic_lower)
            })
            .cloned()
            .collect())
    }
}
