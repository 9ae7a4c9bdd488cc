use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A persisted calendar entry. Durability is owned by the backing store;
/// the engine only reads and writes through `store::EntryStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDateTime>,
    pub priority: u8,
    pub recurrence: Option<Recurrence>,
    pub recurrence_end: Option<NaiveDate>,
    pub color: Option<EntryColor>,
    pub done: bool,
    pub user_id: i64,
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub title: String,
    pub description: Option<String>,
    pub deadline: NaiveDateTime,
    pub priority: u8,
    pub recurrence: Option<Recurrence>,
    pub recurrence_end: Option<NaiveDate>,
    pub color: Option<EntryColor>,
    pub user_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn label_de(self) -> &'static str {
        match self {
            Recurrence::Daily => "Täglich",
            Recurrence::Weekly => "Wöchentlich",
            Recurrence::Monthly => "Monatlich",
        }
    }
}

/// The four colors the calendar frontend supports. Anything else a user
/// mentions is tracked as an unsupported color on the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryColor {
    Rot,
    Gruen,
    Blau,
    Gelb,
}

impl EntryColor {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryColor::Rot => "rot",
            EntryColor::Gruen => "grün",
            EntryColor::Blau => "blau",
            EntryColor::Gelb => "gelb",
        }
    }

    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "rot" => Some(EntryColor::Rot),
            "grün" => Some(EntryColor::Gruen),
            "blau" => Some(EntryColor::Blau),
            "gelb" => Some(EntryColor::Gelb),
            _ => None,
        }
    }
}
