use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use terminBot::clients::lm_client::CompletionClient;
use terminBot::error::{CompletionError, EngineError, StoreError};
use terminBot::models::conversation::{ChatTurn, Role};
use terminBot::models::entry::{NewEntry, ScheduleEntry};
use terminBot::service::chat_service::ChatEngine;
use terminBot::service::intent::Intent;
use terminBot::store::memory::MemoryStore;
use terminBot::store::{ConversationStore, EntryStore};
use tokio::sync::Mutex;

struct FakeCompletion {
    response: Result<String, String>,
    requests: Mutex<Vec<Vec<ChatTurn>>>,
}

impl FakeCompletion {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(err: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Err(err.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    async fn last_request(&self) -> Vec<ChatTurn> {
        let requests = self.requests.lock().await;
        requests.last().cloned().unwrap_or_default()
    }

    async fn last_fact_block(&self) -> Option<String> {
        let turns = self.last_request().await;
        let last = turns.last()?;
        (last.role == Role::User && last.content.starts_with("SYSTEM-INFO"))
            .then(|| last.content.clone())
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, CompletionError> {
        self.requests.lock().await.push(turns.to_vec());
        match &self.response {
            Ok(body) => Ok(body.clone()),
            Err(err) => Err(CompletionError::Request(err.clone())),
        }
    }
}

/// Store whose insert always fails; lookups behave as if the store is empty.
struct FailingStore;

#[async_trait]
impl EntryStore for FailingStore {
    async fn entries_in_range(
        &self,
        _user_id: i64,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(Vec::new())
    }

    async fn recurring_entries(
        &self,
        _user_id: i64,
        _until: NaiveDateTime,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(Vec::new())
    }

    async fn find_duplicate(
        &self,
        _user_id: i64,
        _title: &str,
        _deadline: NaiveDateTime,
    ) -> Result<Option<ScheduleEntry>, StoreError> {
        Ok(None)
    }

    async fn find_conflict(
        &self,
        _user_id: i64,
        _deadline: NaiveDateTime,
    ) -> Result<Option<ScheduleEntry>, StoreError> {
        Ok(None)
    }

    async fn insert(&self, _entry: NewEntry) -> Result<ScheduleEntry, StoreError> {
        Err(StoreError::Backend("datenbank nicht erreichbar".to_string()))
    }

    async fn get(&self, _id: i64) -> Result<Option<ScheduleEntry>, StoreError> {
        Ok(None)
    }

    async fn entries_matching_title(
        &self,
        _user_id: i64,
        _topic: &str,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(Vec::new())
    }
}

fn sunday_morning() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 18)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn deadline(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

#[tokio::test]
async fn write_turn_materializes_and_reports_success() {
    let store = Arc::new(MemoryStore::new());
    let completion = FakeCompletion::replying("Erledigt, dein Termin steht.");
    let engine = ChatEngine::new(
        store.clone(),
        Arc::new(ConversationStore::new()),
        completion.clone(),
    );

    let outcome = engine
        .handle_turn_at(1, "Trage Zahnarzt morgen um 10 Uhr ein", None, sunday_morning())
        .await
        .unwrap();

    assert_eq!(outcome.intent, Intent::Write);
    assert_eq!(outcome.reply, "Erledigt, dein Termin steht.");
    let entry_id = outcome.created_entry_id.expect("entry should be created");
    let stored = store.get(entry_id).await.unwrap().expect("entry in store");
    assert_eq!(stored.title, "Zahnarzt");
    assert_eq!(stored.deadline, Some(deadline(2026, 1, 19, 10, 0)));

    let request = completion.last_request().await;
    assert_eq!(request[0].role, Role::System);
    let fact = completion.last_fact_block().await.expect("fact block");
    assert!(fact.contains("Termin 'Zahnarzt' erfolgreich gespeichert"));
    assert!(fact.contains("Datum='19.01.2026 10:00'"));
}

#[tokio::test]
async fn repeating_the_same_write_does_not_duplicate() {
    let store = Arc::new(MemoryStore::new());
    let completion = FakeCompletion::replying("Ok.");
    let engine = ChatEngine::new(
        store.clone(),
        Arc::new(ConversationStore::new()),
        completion.clone(),
    );

    let first = engine
        .handle_turn_at(1, "Trage Zahnarzt morgen um 10 Uhr ein", None, sunday_morning())
        .await
        .unwrap();
    assert!(first.created_entry_id.is_some());

    let second = engine
        .handle_turn_at(1, "Trage Zahnarzt morgen um 10 Uhr ein", None, sunday_morning())
        .await
        .unwrap();
    assert_eq!(second.created_entry_id, None);
    let fact = completion.last_fact_block().await.expect("fact block");
    assert!(fact.contains("existiert bereits"));

    let stored = store
        .entries_in_range(1, deadline(2026, 1, 18, 0, 0), deadline(2026, 1, 26, 0, 0))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn conflicting_slot_is_reported_not_overwritten() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(vec![NewEntry {
            title: "Meeting".to_string(),
            description: None,
            deadline: deadline(2026, 1, 19, 10, 0),
            priority: 1,
            recurrence: None,
            recurrence_end: None,
            color: None,
            user_id: 1,
        }])
        .await
        .unwrap();
    let completion = FakeCompletion::replying("Da ist schon etwas.");
    let engine = ChatEngine::new(
        store.clone(),
        Arc::new(ConversationStore::new()),
        completion.clone(),
    );

    let outcome = engine
        .handle_turn_at(1, "Trage Zahnarzt morgen um 10 Uhr ein", None, sunday_morning())
        .await
        .unwrap();

    assert_eq!(outcome.created_entry_id, None);
    let fact = completion.last_fact_block().await.expect("fact block");
    assert!(fact.contains("KONNTE NICHT gespeichert"));
    assert!(fact.contains("'Meeting'"));

    let stored = store
        .entries_in_range(1, deadline(2026, 1, 18, 0, 0), deadline(2026, 1, 26, 0, 0))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "Meeting");
}

#[tokio::test]
async fn conflict_keeps_the_candidate_pending_for_a_redirect() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(vec![NewEntry {
            title: "Meeting".to_string(),
            description: None,
            deadline: deadline(2026, 1, 19, 10, 0),
            priority: 1,
            recurrence: None,
            recurrence_end: None,
            color: None,
            user_id: 1,
        }])
        .await
        .unwrap();
    let completion = FakeCompletion::replying("Um 10 ist schon 'Meeting'.");
    let engine = ChatEngine::new(
        store.clone(),
        Arc::new(ConversationStore::new()),
        completion,
    );

    let first = engine
        .handle_turn_at(1, "Trage Zahnarzt morgen um 10 Uhr ein", None, sunday_morning())
        .await
        .unwrap();
    assert_eq!(first.created_entry_id, None);

    // A bare new time is enough; title and day survive from the conflicting
    // attempt.
    let second = engine
        .handle_turn_at(
            1,
            "Dann lieber um 11 Uhr",
            Some(first.conversation_id.clone()),
            sunday_morning(),
        )
        .await
        .unwrap();
    let entry_id = second.created_entry_id.expect("redirect should create");
    let stored = store.get(entry_id).await.unwrap().expect("entry in store");
    assert_eq!(stored.title, "Zahnarzt");
    assert_eq!(stored.deadline, Some(deadline(2026, 1, 19, 11, 0)));
}

#[tokio::test]
async fn store_failure_surfaces_as_system_error_fact() {
    let completion = FakeCompletion::replying("Es gab einen Fehler beim Speichern.");
    let engine = ChatEngine::new(
        Arc::new(FailingStore),
        Arc::new(ConversationStore::new()),
        completion.clone(),
    );

    let outcome = engine
        .handle_turn_at(1, "Trage Zahnarzt morgen um 10 Uhr ein", None, sunday_morning())
        .await
        .unwrap();

    assert_eq!(outcome.created_entry_id, None);
    let fact = completion.last_fact_block().await.expect("fact block");
    assert!(fact.contains("Interner Fehler"));
    assert!(fact.contains("datenbank nicht erreichbar"));
}

#[tokio::test]
async fn completion_failure_propagates_but_entry_is_already_committed() {
    let store = Arc::new(MemoryStore::new());
    let completion = FakeCompletion::failing("connection refused");
    let engine = ChatEngine::new(
        store.clone(),
        Arc::new(ConversationStore::new()),
        completion,
    );

    let result = engine
        .handle_turn_at(1, "Trage Zahnarzt morgen um 10 Uhr ein", None, sunday_morning())
        .await;

    assert!(matches!(result, Err(EngineError::Completion(_))));
    let stored = store
        .entries_in_range(1, deadline(2026, 1, 18, 0, 0), deadline(2026, 1, 26, 0, 0))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "Zahnarzt");
}

#[tokio::test]
async fn smalltalk_turn_sends_no_fact_block() {
    let store = Arc::new(MemoryStore::new());
    let completion = FakeCompletion::replying("Hallo! Wie kann ich helfen?");
    let engine = ChatEngine::new(
        store,
        Arc::new(ConversationStore::new()),
        completion.clone(),
    );

    let outcome = engine
        .handle_turn_at(1, "Hallo, guten Tag!", None, sunday_morning())
        .await
        .unwrap();

    assert_eq!(outcome.intent, Intent::Chat);
    assert_eq!(outcome.created_entry_id, None);
    assert!(completion.last_fact_block().await.is_none());
    let request = completion.last_request().await;
    assert_eq!(request.last().unwrap().content, "Hallo, guten Tag!");
}
