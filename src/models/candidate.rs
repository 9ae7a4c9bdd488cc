use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::entry::{EntryColor, Recurrence};

/// End of a recurring series: either an explicit date or a duration
/// ("für N wochen") that stays symbolic until a concrete start exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceEnd {
    Date(NaiveDate),
    Weeks(u32),
}

impl RecurrenceEnd {
    pub fn resolve(self, start: NaiveDateTime) -> NaiveDate {
        match self {
            RecurrenceEnd::Date(d) => d,
            RecurrenceEnd::Weeks(n) => (start + Duration::weeks(i64::from(n))).date(),
        }
    }
}

/// One utterance's worth of extracted scheduling information. Also the shape
/// of the pending state accumulated across turns of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleCandidate {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub date_explicit: bool,
    pub time: Option<(u32, u32)>,
    pub time_explicit: bool,
    pub all_day: bool,
    pub priority: u8,
    pub color: Option<EntryColor>,
    pub unsupported_color: Option<String>,
    pub recurrence: Option<Recurrence>,
    pub recurrence_end: Option<RecurrenceEnd>,
}

impl Default for ScheduleCandidate {
    fn default() -> Self {
        Self {
            title: None,
            date: None,
            date_explicit: false,
            time: None,
            time_explicit: false,
            all_day: false,
            priority: 1,
            color: None,
            unsupported_color: None,
            recurrence: None,
            recurrence_end: None,
        }
    }
}

impl ScheduleCandidate {
    /// Concrete timestamp: date plus time, midnight when only a date is known.
    pub fn deadline(&self) -> Option<NaiveDateTime> {
        let date = self.date?;
        let (hour, minute) = self.time.unwrap_or((0, 0));
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        Some(date.and_time(time))
    }

    /// A candidate may be persisted once a title exists, a concrete
    /// timestamp resolved, and the time was stated (or the entry is all-day).
    pub fn is_materializable(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_empty())
            && self.deadline().is_some()
            && (self.time_explicit || self.all_day)
    }

    /// Fields still needed before materialization, for the narration layer.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.date.is_none() {
            missing.push("Datum");
        }
        if self.title.as_deref().is_none_or(str::is_empty) {
            missing.push("Titel");
        }
        if !(self.time_explicit || self.all_day || self.time.is_some()) {
            missing.push("Uhrzeit");
        }
        missing
    }

    /// Anything worth keeping for a later turn?
    pub fn has_partial_info(&self) -> bool {
        self.date.is_some() || self.title.is_some()
    }
}
