//! Conversation orchestrator: classify, extract, merge, materialize or
//! report, assemble the fact block, narrate, record. The entry write always
//! commits before the completion call so a narration failure can never lose
//! or duplicate a calendar entry.

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::clients::lm_client::CompletionClient;
use crate::error::{EngineError, StoreError};
use crate::extract;
use crate::extract::stopwords::AUTO_PICK_PHRASES;
use crate::models::candidate::ScheduleCandidate;
use crate::models::conversation::{ChatTurn, ConversationState};
use crate::models::entry::{NewEntry, ScheduleEntry};
use crate::service::calendar;
use crate::service::habit;
use crate::service::intent::{self, Intent};
use crate::service::merge;
use crate::store::{ConversationStore, EntryStore};

const RESPONDER_SYSTEM_PROMPT: &str = concat!(
    "Du bist ein intelligenter Aufgabenplaner-Assistent. ",
    "Deine Aufgabe ist es, Termine zu verwalten und Fragen zu beantworten.\n\n",
    "REGELN:\n",
    "1. WRITE: Wenn der User einen Termin nennt, bestätige ihn.\n",
    "2. SUGGEST/READ (Kalender-Fragen): Nutze IMMER die Daten aus 'SYSTEM-INFO'.\n",
    "   - Fall A (Übersicht): Wenn der User fragt 'Wie sieht meine Woche aus?' oder 'Welche Termine habe ich?', dann LISTE ALLE TERMINE aus SYSTEM-INFO chronologisch auf. \n",
    "     -> WICHTIG: Kein 'zum Beispiel'. Nenne ALLE Termine. Ignoriere hierbei das 2-Satz-Limit.\n",
    "   - Fall B (Freie Zeit): Wenn der User fragt 'Wann habe ich Zeit?', nenne VOR ALLEM die freien Lücken/Tage ('KOMPLETT FREI').\n",
    "     -> ABER: Zur besseren Orientierung, nenne auch kurz die Tage, an denen schon Termine sind (damit der User weiß, warum keine Zeit ist).\n",
    "     -> Ausgabe-Format: Pro Tag eine Zeile. Sortiere die Ausgabe STRENG CHRONOLOGISCH.\n",
    "   - Fall C (Vorschlag): Wenn der User einen Vorschlag will, nenne IMMER einen konkreten Slot (Tag UND Uhrzeit). Sag nicht nur 'am Donnerstag', sondern z.B. 'am Donnerstag um 18:00 Uhr'. Nutze vorzugsweise 'KI-HINWEIS' (Gewohnheiten), wenn vorhanden.\n",
    "   - ACHTUNG: Die Infos sind nach KALENDERWOCHEN gruppiert. Nenne Termine aus der FALSCHEN Woche NICHT.\n\n",
    "3. FEHLER: Wenn [SYSTEM-ERROR], antworte: 'Fehler beim Speichern: [Fehler]. Bitte versuche es erneut.'\n\n",
    "4. CHAT: Für allgemeine Gespräche antworte kurz (max. 2 Sätze) und freundlich. (Gilt NICHT für Kalender-Listen).\n\n",
    "ABSOLUT KRITISCH:\n",
    "- Antworte AUSSCHLIESSLICH auf Deutsch. Keine Denkprozesse, keine anderen Sprachen.\n",
    "- Keine internen Monologe oder 'Chain of Thought' Ausgaben.\n",
    "- ERFINDE NIEMALS Informationen.\n",
    "- Wenn 'erfolgreich gespeichert' in SYSTEM-INFO, BESTÄTIGE EINFACH.\n",
    "- Wenn 'SYSTEM-INFO: Termin NICHT gespeichert' kommt, MALE KEINE Bestätigung aus. Sag dem User KLIPP UND KLAR: 'Konnte nicht gespeichert werden, weil...'.\n",
    "- Wenn 'SYSTEM-INFO: Termin NICHT gespeichert' kommt, dann hat es NICHT geklappt. Ignoriere deine eigene Annahme, dass du es 'verstanden' hast.\n",
    "- Stelle KEINE Gegenfragen zu gespeicherten Terminen.\n",
);

/// How many recent assistant turns are scanned for a previously offered slot.
const OFFERED_SLOT_LOOKBACK: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub conversation_id: String,
    pub created_entry_id: Option<i64>,
    pub intent: Intent,
}

enum Materialized {
    Created(ScheduleEntry),
    Duplicate(ScheduleEntry),
    Conflict(ScheduleEntry),
}

pub struct ChatEngine {
    entries: Arc<dyn EntryStore>,
    conversations: Arc<ConversationStore>,
    completion: Arc<dyn CompletionClient>,
}

impl ChatEngine {
    pub fn new(
        entries: Arc<dyn EntryStore>,
        conversations: Arc<ConversationStore>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            entries,
            conversations,
            completion,
        }
    }

    /// Discards history and pending state for one conversation.
    pub async fn end_conversation(&self, conversation_id: &str) {
        self.conversations.end_conversation(conversation_id).await;
    }

    pub async fn handle_turn(
        &self,
        user_id: i64,
        prompt: &str,
        conversation_id: Option<String>,
    ) -> Result<TurnOutcome, EngineError> {
        self.handle_turn_at(user_id, prompt, conversation_id, Local::now().naive_local())
            .await
    }

    /// Same as `handle_turn` with an injected clock.
    pub async fn handle_turn_at(
        &self,
        user_id: i64,
        prompt: &str,
        conversation_id: Option<String>,
        now: NaiveDateTime,
    ) -> Result<TurnOutcome, EngineError> {
        let conversation_id = conversation_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let current_intent = intent::classify(prompt);
        tracing::debug!(
            conversation = %conversation_id,
            intent = current_intent.as_str(),
            "handling turn"
        );

        let state_handle = self.conversations.state(&conversation_id).await;

        // Merge and (maybe) materialize under the conversation lock so a
        // racing double-submit cannot interleave with the pending state.
        let (history, fact_block, created_entry) = {
            let mut state = state_handle.lock().await;
            state.push_turn(ChatTurn::user(prompt));

            let mut candidate = extract::extract(prompt, now);
            adopt_offered_slot(&mut candidate, prompt, &state, now);
            let pending = state.pending.clone().unwrap_or_default();
            let mut merged = merge::merge_candidates(&candidate, &pending);
            backfill_title(&mut merged, &state);

            let mut created_entry: Option<ScheduleEntry> = None;
            let fact_block = if merged.is_materializable() {
                match self.materialize(user_id, &merged).await {
                    Ok(Materialized::Created(entry)) => {
                        state.pending = None;
                        let fact = created_fact(&entry, &merged);
                        created_entry = Some(entry);
                        Some(fact)
                    }
                    Ok(Materialized::Duplicate(existing)) => Some(duplicate_fact(&existing)),
                    Ok(Materialized::Conflict(existing)) => {
                        // The merged candidate stays pending so the user can
                        // redirect ("dann lieber um 11") without repeating
                        // title and date.
                        state.pending = Some(merged.clone());
                        Some(conflict_fact(&existing, merged.deadline()))
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "materialization failed");
                        Some(store_failure_fact(&err))
                    }
                }
            } else {
                if merged.has_partial_info() {
                    state.pending = Some(merged.clone());
                }
                self.incomplete_turn_fact(user_id, prompt, current_intent, &state, now)
                    .await?
            };

            (state.history.clone(), fact_block, created_entry)
        };

        let mut turns = vec![ChatTurn::system(RESPONDER_SYSTEM_PROMPT)];
        turns.extend(history);
        if let Some(fact) = fact_block {
            tracing::debug!(fact = %fact, "fact block assembled");
            turns.push(ChatTurn::user(fact));
        }

        let raw_reply = self.completion.complete(&turns).await?;
        let reply = clean_reply(&raw_reply);

        {
            let mut state = state_handle.lock().await;
            state.push_turn(ChatTurn::assistant(reply.clone()));
        }

        Ok(TurnOutcome {
            reply,
            conversation_id,
            created_entry_id: created_entry.map(|e| e.id),
            intent: current_intent,
        })
    }

    async fn materialize(
        &self,
        user_id: i64,
        candidate: &ScheduleCandidate,
    ) -> Result<Materialized, StoreError> {
        let Some(deadline) = candidate.deadline() else {
            return Err(StoreError::Backend(
                "materialization without a deadline".to_string(),
            ));
        };
        let title = candidate.title.clone().unwrap_or_else(|| "Termin".to_string());

        if let Some(existing) = self.entries.find_duplicate(user_id, &title, deadline).await? {
            return Ok(Materialized::Duplicate(existing));
        }
        if let Some(existing) = self.entries.find_conflict(user_id, deadline).await? {
            return Ok(Materialized::Conflict(existing));
        }

        let entry = self
            .entries
            .insert(NewEntry {
                title,
                description: None,
                deadline,
                priority: candidate.priority,
                recurrence: candidate.recurrence,
                recurrence_end: candidate.recurrence_end.map(|end| end.resolve(deadline)),
                color: candidate.color,
                user_id,
            })
            .await?;
        tracing::info!(entry = entry.id, user = user_id, "entry materialized");
        Ok(Materialized::Created(entry))
    }

    /// Fact block for a turn that did not materialize anything: either the
    /// missing-field report for a WRITE, or a calendar window when the user
    /// asked for one (or a pending topic is still waiting for a slot).
    async fn incomplete_turn_fact(
        &self,
        user_id: i64,
        prompt: &str,
        current_intent: Intent,
        state: &ConversationState,
        now: NaiveDateTime,
    ) -> Result<Option<String>, EngineError> {
        if current_intent == Intent::Write {
            return Ok(state.pending.as_ref().map(|pending| {
                let missing = pending.missing_fields();
                if missing.is_empty() {
                    format!(
                        "SYSTEM-INFO: Termin konnte nicht erstellt werden (Unbekannter Grund). Vorhandene Daten: {pending:?}"
                    )
                } else {
                    format!(
                        "SYSTEM-INFO: Termin unvollständig. Es fehlen: {}.",
                        missing.join(", ")
                    )
                }
            }));
        }

        let pending_topic = state.pending.as_ref().and_then(|p| {
            (p.date.is_none()).then(|| p.title.clone()).flatten()
        });
        if current_intent != Intent::Suggest && pending_topic.is_none() {
            return Ok(None);
        }

        let range = calendar::resolve_window(prompt, now);
        let entries = self
            .entries
            .entries_in_range(user_id, range.start, range.end())
            .await?;
        let recurring = self.entries.recurring_entries(user_id, range.end()).await?;
        let hint = match &pending_topic {
            Some(topic) => {
                let past = self.entries.entries_matching_title(user_id, topic).await?;
                habit::infer_habit(topic, &past).map(|slot| habit::habit_hint(topic, slot))
            }
            None => None,
        };
        Ok(Some(calendar::synthesize_window(
            range,
            &entries,
            &recurring,
            hint.as_deref(),
        )))
    }
}

static OFFERED_SLOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.?,?.*?(\d{1,2}):(\d{2})").unwrap());

/// Implicit acceptance ("egal", "mach du"): when the current candidate has
/// no date of its own, the most recent assistant turns are scanned for a
/// previously offered "day.month ... hour:minute" slot, which then counts
/// as explicitly confirmed.
fn adopt_offered_slot(
    candidate: &mut ScheduleCandidate,
    prompt: &str,
    state: &ConversationState,
    now: NaiveDateTime,
) {
    let lower = prompt.to_lowercase();
    if !AUTO_PICK_PHRASES.iter().any(|p| lower.contains(p)) {
        return;
    }
    if candidate.date.is_some() {
        return;
    }
    for turn in state
        .assistant_turns_newest_first()
        .take(OFFERED_SLOT_LOOKBACK)
    {
        let Some(caps) = OFFERED_SLOT_RE.captures(&turn.content) else {
            continue;
        };
        let (Ok(day), Ok(month), Ok(hour), Ok(minute)) = (
            caps[1].parse::<u32>(),
            caps[2].parse::<u32>(),
            caps[3].parse::<u32>(),
            caps[4].parse::<u32>(),
        ) else {
            continue;
        };
        // An offer made for early next year may surface while it is still
        // late this year.
        let mut year = now.year();
        if month < now.month() && now.month() > 10 {
            year += 1;
        }
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            continue;
        };
        if NaiveTime::from_hms_opt(hour, minute, 0).is_none() {
            continue;
        }
        candidate.date = Some(date);
        candidate.date_explicit = true;
        candidate.time = Some((hour, minute));
        candidate.time_explicit = true;
        tracing::debug!(%date, hour, minute, "adopted previously offered slot");
        return;
    }
}

static OFFERED_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Termin '([^']+)'|Aufgabe '([^']+)'").unwrap());

/// A slot without a title picks up the entry name last mentioned by the
/// assistant ("Termin 'Zahnarzt'").
fn backfill_title(merged: &mut ScheduleCandidate, state: &ConversationState) {
    if merged.title.is_some() || merged.deadline().is_none() {
        return;
    }
    for turn in state.assistant_turns_newest_first() {
        if let Some(caps) = OFFERED_TITLE_RE.captures(&turn.content) {
            let found = caps.get(1).or_else(|| caps.get(2));
            if let Some(title) = found {
                merged.title = Some(title.as_str().to_string());
                return;
            }
        }
    }
}

fn created_fact(entry: &ScheduleEntry, candidate: &ScheduleCandidate) -> String {
    let mut details = Vec::new();
    if let Some(deadline) = entry.deadline {
        details.push(format!("Datum='{}'", deadline.format("%d.%m.%Y %H:%M")));
    }
    if entry.priority > 1 {
        details.push("Priorität='Hoch/Wichtig'".to_string());
    }
    if let Some(color) = entry.color {
        details.push(format!("Farbe='{}'", color.as_str()));
    } else if let Some(unsupported) = &candidate.unsupported_color {
        details.push(format!(
            "WARNUNG: Farbe '{unsupported}' nicht unterstützt (nur: rot, grün, blau, gelb)"
        ));
    }
    if let Some(recurrence) = entry.recurrence {
        details.push(format!("Wiederholung='{}'", recurrence.label_de()));
    }
    format!(
        "SYSTEM-INFO: Termin '{}' erfolgreich gespeichert ({}).",
        entry.title,
        details.join(", ")
    )
}

fn conflict_fact(existing: &ScheduleEntry, deadline: Option<NaiveDateTime>) -> String {
    let when = deadline
        .map(|d| d.format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|| "diesem Zeitpunkt".to_string());
    format!(
        "SYSTEM-INFO: Termin KONNTE NICHT gespeichert werden. Es gibt bereits einen Termin um diese Zeit ({when}): '{}'. Frage den User, ob er ihn verschieben möchte.",
        existing.title
    )
}

fn duplicate_fact(existing: &ScheduleEntry) -> String {
    match existing.deadline {
        Some(deadline) => format!(
            "SYSTEM-INFO: Ein Termin mit diesem Titel und Datum existiert bereits: Titel='{}', Datum='{}'. Sag dem User, dass der Termin schon existiert.",
            existing.title,
            deadline.format("%d.%m.%Y %H:%M")
        ),
        None => format!(
            "SYSTEM-INFO: Ein Termin mit diesem Titel existiert bereits: Titel='{}'.",
            existing.title
        ),
    }
}

fn store_failure_fact(err: &StoreError) -> String {
    format!(
        "SYSTEM-INFO: Termin KONNTE NICHT gespeichert werden (Interner Fehler: {err}). Sag dem User, dass es einen Fehler gab."
    )
}

static EMPHASIS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*+").unwrap());
static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

/// Strips markdown emphasis and collapses blank lines and repeated
/// whitespace before the reply is stored in history.
pub fn clean_reply(raw: &str) -> String {
    let without_emphasis = EMPHASIS_RE.replace_all(raw, "");
    let without_backticks = without_emphasis.replace('`', "");
    let joined = without_backticks
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    MULTI_SPACE_RE.replace_all(&joined, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::EntryColor;

    #[test]
    fn clean_reply_strips_markdown_and_blank_lines() {
        let raw = "**Dein  Termin**\n\n\n`steht`:   morgen\n";
        assert_eq!(clean_reply(raw), "Dein Termin\nsteht: morgen");
    }

    #[test]
    fn created_fact_lists_details() {
        let entry = ScheduleEntry {
            id: 1,
            title: "Zahnarzt".to_string(),
            description: None,
            deadline: NaiveDate::from_ymd_opt(2026, 1, 19)
                .unwrap()
                .and_hms_opt(10, 0, 0),
            priority: 3,
            recurrence: None,
            recurrence_end: None,
            color: Some(EntryColor::Blau),
            done: false,
            user_id: 1,
        };
        let fact = created_fact(&entry, &ScheduleCandidate::default());
        assert!(fact.contains("Termin 'Zahnarzt' erfolgreich gespeichert"));
        assert!(fact.contains("Datum='19.01.2026 10:00'"));
        assert!(fact.contains("Priorität='Hoch/Wichtig'"));
        assert!(fact.contains("Farbe='blau'"));
    }

    #[test]
    fn created_fact_warns_about_unsupported_color() {
        let entry = ScheduleEntry {
            id: 1,
            title: "Kino".to_string(),
            description: None,
            deadline: NaiveDate::from_ymd_opt(2026, 1, 19)
                .unwrap()
                .and_hms_opt(20, 0, 0),
            priority: 1,
            recurrence: None,
            recurrence_end: None,
            color: None,
            done: false,
            user_id: 1,
        };
        let candidate = ScheduleCandidate {
            unsupported_color: Some("lila".to_string()),
            ..ScheduleCandidate::default()
        };
        let fact = created_fact(&entry, &candidate);
        assert!(fact.contains("WARNUNG: Farbe 'lila' nicht unterstützt"));
    }

    #[test]
    fn offered_slot_regex_reads_day_month_and_time() {
        let caps = OFFERED_SLOT_RE
            .captures("Wie wäre der 22.01., um 15:00 Uhr?")
            .unwrap();
        assert_eq!(&caps[1], "22");
        assert_eq!(&caps[2], "01");
        assert_eq!(&caps[3], "15");
        assert_eq!(&caps[4], "00");
    }

    #[test]
    fn backfill_pulls_title_from_recent_assistant_turn() {
        let mut state = ConversationState::default();
        state.push_turn(ChatTurn::assistant(
            "Der Termin 'Zahnarzt' braucht noch eine Uhrzeit.",
        ));
        let mut merged = ScheduleCandidate {
            date: NaiveDate::from_ymd_opt(2026, 1, 19),
            time: Some((10, 0)),
            time_explicit: true,
            ..ScheduleCandidate::default()
        };
        backfill_title(&mut merged, &state);
        assert_eq!(merged.title.as_deref(), Some("Zahnarzt"));
    }
}
