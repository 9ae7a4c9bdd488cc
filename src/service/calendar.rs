//! Calendar window synthesis: a deterministic, ISO-week-grouped textual
//! report of occupied and free days. This text is the ground-truth block
//! handed to the completion service, scoped per calendar week so the model
//! cannot attribute an entry to the wrong week.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::models::entry::{Recurrence, ScheduleEntry};

const WEEKDAY_NAMES: &[&str] = &[
    "Montag",
    "Dienstag",
    "Mittwoch",
    "Donnerstag",
    "Freitag",
    "Samstag",
    "Sonntag",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRange {
    pub start: NaiveDateTime,
    pub days: i64,
}

impl WindowRange {
    /// Exclusive upper bound: the first instant after the last emitted day.
    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::days(self.days)
    }
}

/// Resolves the report window from relative-range keywords in the utterance,
/// defaulting to a 14-day lookahead from now.
pub fn resolve_window(text: &str, now: NaiveDateTime) -> WindowRange {
    let lower = text.to_lowercase();
    let today = now.date();
    let midnight = today.and_hms_opt(0, 0, 0).unwrap_or(now);
    let weekday = today.weekday().num_days_from_monday() as i64;

    if lower.contains("nächsten monat") || lower.contains("nächster monat") {
        let (year, month) = if today.month() == 12 {
            (today.year() + 1, 1)
        } else {
            (today.year(), today.month() + 1)
        };
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(midnight);
        return WindowRange { start, days: 31 };
    }
    if lower.contains("nächste woche") || lower.contains("kommende woche") {
        let start = midnight + Duration::days(7 - weekday);
        return WindowRange { start, days: 7 };
    }
    if lower.contains("diese woche") || lower.contains("meine woche") || lower.contains("aktuelle woche")
    {
        let rest_of_week = 7 - weekday;
        // Late in the week the remainder is too thin to be useful, so the
        // next week is included as well.
        let days = if weekday >= 4 {
            rest_of_week + 7
        } else {
            rest_of_week
        }
        .max(1);
        return WindowRange {
            start: midnight,
            days,
        };
    }
    WindowRange {
        start: midnight,
        days: 14,
    }
}

/// One concrete date+time instance inside the window: either a stored entry
/// or one expansion step of a recurring entry.
#[derive(Debug, Clone)]
pub enum ScheduleOccurrence {
    Concrete(ScheduleEntry),
    Virtual {
        title: String,
        deadline: NaiveDateTime,
        priority: u8,
        source_entry_id: i64,
    },
}

impl ScheduleOccurrence {
    fn deadline(&self) -> Option<NaiveDateTime> {
        match self {
            ScheduleOccurrence::Concrete(entry) => entry.deadline,
            ScheduleOccurrence::Virtual { deadline, .. } => Some(*deadline),
        }
    }

    fn title(&self) -> &str {
        match self {
            ScheduleOccurrence::Concrete(entry) => &entry.title,
            ScheduleOccurrence::Virtual { title, .. } => title,
        }
    }

    fn priority(&self) -> u8 {
        match self {
            ScheduleOccurrence::Concrete(entry) => entry.priority,
            ScheduleOccurrence::Virtual { priority, .. } => *priority,
        }
    }

    fn entry_id(&self) -> i64 {
        match self {
            ScheduleOccurrence::Concrete(entry) => entry.id,
            ScheduleOccurrence::Virtual {
                source_entry_id, ..
            } => *source_entry_id,
        }
    }
}

/// Builds the week-grouped report. `entries` are the undone entries whose
/// timestamp falls inside the window; `recurring` are the undone recurring
/// entries anchored at or before the window end. The two may overlap; the
/// expansion skips days where the same entry identity is already bucketed.
pub fn synthesize_window(
    range: WindowRange,
    entries: &[ScheduleEntry],
    recurring: &[ScheduleEntry],
    habit_hint: Option<&str>,
) -> String {
    let mut by_date: BTreeMap<NaiveDate, Vec<ScheduleOccurrence>> = BTreeMap::new();
    for entry in entries {
        if let Some(deadline) = entry.deadline {
            by_date
                .entry(deadline.date())
                .or_default()
                .push(ScheduleOccurrence::Concrete(entry.clone()));
        }
    }

    expand_recurring(&mut by_date, range, recurring);

    for occurrences in by_date.values_mut() {
        occurrences.sort_by_key(|o| o.deadline());
    }

    let end = range.end();
    let mut lines = vec![format!(
        "SYSTEM-INFO (Kalender-Übersicht vom {} bis {}):",
        range.start.format("%d.%m."),
        end.format("%d.%m.")
    )];
    if let Some(hint) = habit_hint {
        lines.push(hint.to_string());
    }

    let mut current_week: Option<(i32, u32)> = None;
    for offset in 0..range.days {
        let day = (range.start + Duration::days(offset)).date();
        let iso = day.iso_week();
        let week_key = (iso.year(), iso.week());
        if current_week != Some(week_key) {
            current_week = Some(week_key);
            lines.push(format!(
                "\n--- KALENDERWOCHE {} ({}) ---",
                iso.week(),
                iso.year()
            ));
        }

        let weekday_name = WEEKDAY_NAMES[day.weekday().num_days_from_monday() as usize];
        let date_str = day.format("%d.%m.");
        match by_date.get(&day) {
            None => lines.push(format!("- {weekday_name} ({date_str}): KOMPLETT FREI")),
            Some(occurrences) => {
                let summaries: Vec<String> = occurrences
                    .iter()
                    .filter_map(|occ| {
                        let deadline = occ.deadline()?;
                        let mark = if occ.priority() > 1 { "[!]" } else { "" };
                        Some(format!("{} {}{}", deadline.format("%H:%M"), occ.title(), mark))
                    })
                    .collect();
                lines.push(format!(
                    "- {weekday_name} ({date_str}): Termine: {}",
                    summaries.join(", ")
                ));
            }
        }
    }
    lines.join("\n")
}

/// Walks each recurring entry day-by-day through the window. An occurrence
/// exists on a day when the pattern matches relative to the anchor date and
/// the day does not exceed the recurrence end.
fn expand_recurring(
    by_date: &mut BTreeMap<NaiveDate, Vec<ScheduleOccurrence>>,
    range: WindowRange,
    recurring: &[ScheduleEntry],
) {
    let end = range.end();
    for entry in recurring {
        let (Some(anchor), Some(rule)) = (entry.deadline, entry.recurrence) else {
            continue;
        };
        let mut current = range.start;
        while current < end {
            let day = current.date();
            if entry.recurrence_end.is_some_and(|rec_end| day > rec_end) {
                break;
            }
            if day >= anchor.date() && occurs_on(rule, anchor, day) {
                let bucket = by_date.entry(day).or_default();
                let already_bucketed = bucket.iter().any(|occ| occ.entry_id() == entry.id);
                if !already_bucketed {
                    bucket.push(ScheduleOccurrence::Virtual {
                        title: entry.title.clone(),
                        deadline: day.and_time(anchor.time()),
                        priority: entry.priority,
                        source_entry_id: entry.id,
                    });
                }
            }
            current += Duration::days(1);
        }
    }
}

fn occurs_on(rule: Recurrence, anchor: NaiveDateTime, day: NaiveDate) -> bool {
    match rule {
        Recurrence::Daily => true,
        Recurrence::Weekly => day.weekday() == anchor.weekday(),
        Recurrence::Monthly => day.day() == anchor.day(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn entry(id: i64, title: &str, deadline: NaiveDateTime) -> ScheduleEntry {
        ScheduleEntry {
            id,
            title: title.to_string(),
            description: None,
            deadline: Some(deadline),
            priority: 1,
            recurrence: None,
            recurrence_end: None,
            color: None,
            done: false,
            user_id: 1,
        }
    }

    #[test]
    fn default_window_is_fourteen_days_from_midnight() {
        let now = at(2026, 1, 18, 9);
        let range = resolve_window("wann habe ich zeit?", now);
        assert_eq!(range.start, at(2026, 1, 18, 0));
        assert_eq!(range.days, 14);
    }

    #[test]
    fn next_week_window_starts_on_monday() {
        // 2026-01-18 is a Sunday; next Monday is the 19th.
        let now = at(2026, 1, 18, 9);
        let range = resolve_window("wie sieht nächste woche aus?", now);
        assert_eq!(range.start, at(2026, 1, 19, 0));
        assert_eq!(range.days, 7);
    }

    #[test]
    fn this_week_late_in_week_extends_into_next() {
        // Friday the 16th: three days remain, so the next week is included.
        let now = at(2026, 1, 16, 9);
        let range = resolve_window("wie sieht meine woche aus?", now);
        assert_eq!(range.start, at(2026, 1, 16, 0));
        assert_eq!(range.days, 10);
    }

    #[test]
    fn next_month_window_starts_on_the_first() {
        let now = at(2026, 12, 18, 9);
        let range = resolve_window("was liegt nächsten monat an?", now);
        assert_eq!(range.start, at(2027, 1, 1, 0));
        assert_eq!(range.days, 31);
    }

    #[test]
    fn free_days_are_marked_and_weeks_grouped() {
        let range = WindowRange {
            start: at(2026, 1, 19, 0),
            days: 7,
        };
        let entries = vec![entry(1, "Zahnarzt", at(2026, 1, 19, 10))];
        let report = synthesize_window(range, &entries, &[], None);
        assert!(report.contains("--- KALENDERWOCHE 4 (2026) ---"));
        assert!(report.contains("- Montag (19.01.): Termine: 10:00 Zahnarzt"));
        assert!(report.contains("- Dienstag (20.01.): KOMPLETT FREI"));
    }

    #[test]
    fn entries_within_a_day_sort_by_time() {
        let range = WindowRange {
            start: at(2026, 1, 19, 0),
            days: 1,
        };
        let entries = vec![
            entry(1, "Spät", at(2026, 1, 19, 18)),
            entry(2, "Früh", at(2026, 1, 19, 8)),
        ];
        let report = synthesize_window(range, &entries, &[], None);
        assert!(report.contains("Termine: 08:00 Früh, 18:00 Spät"));
    }

    #[test]
    fn daily_recurrence_respects_end_date() {
        let range = WindowRange {
            start: at(2026, 1, 24, 0),
            days: 4,
        };
        let mut joggen = entry(7, "Joggen", at(2026, 1, 20, 7));
        joggen.recurrence = Some(Recurrence::Daily);
        joggen.recurrence_end = NaiveDate::from_ymd_opt(2026, 1, 25);
        let report = synthesize_window(range, &[], &[joggen], None);
        assert!(report.contains("- Samstag (24.01.): Termine: 07:00 Joggen"));
        assert!(report.contains("- Sonntag (25.01.): Termine: 07:00 Joggen"));
        assert!(report.contains("- Montag (26.01.): KOMPLETT FREI"));
        assert!(report.contains("- Dienstag (27.01.): KOMPLETT FREI"));
    }

    #[test]
    fn concrete_override_suppresses_virtual_occurrence() {
        let range = WindowRange {
            start: at(2026, 1, 19, 0),
            days: 1,
        };
        let mut yoga = entry(3, "Yoga", at(2026, 1, 19, 18));
        yoga.recurrence = Some(Recurrence::Weekly);
        let report = synthesize_window(range, std::slice::from_ref(&yoga), &[yoga.clone()], None);
        let occurrences = report.matches("18:00 Yoga").count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn recurrence_expansion_stops_at_the_window_end() {
        let range = WindowRange {
            start: at(2026, 1, 19, 0),
            days: 2,
        };
        let mut joggen = entry(8, "Joggen", at(2026, 1, 19, 7));
        joggen.recurrence = Some(Recurrence::Daily);
        let report = synthesize_window(range, &[], &[joggen], None);
        assert_eq!(report.matches("07:00 Joggen").count(), 2);
        assert!(!report.contains("(21.01.)"));
    }

    #[test]
    fn weekly_recurrence_lands_on_anchor_weekday() {
        let range = WindowRange {
            start: at(2026, 1, 19, 0),
            days: 7,
        };
        // Anchored on Tuesday the 20th.
        let mut stammtisch = entry(4, "Stammtisch", at(2026, 1, 20, 19));
        stammtisch.recurrence = Some(Recurrence::Weekly);
        let report = synthesize_window(range, &[], &[stammtisch], None);
        assert!(report.contains("- Dienstag (20.01.): Termine: 19:00 Stammtisch"));
        assert!(report.contains("- Mittwoch (21.01.): KOMPLETT FREI"));
    }

    #[test]
    fn high_priority_entries_are_marked() {
        let range = WindowRange {
            start: at(2026, 1, 19, 0),
            days: 1,
        };
        let mut urgent = entry(5, "Abgabe", at(2026, 1, 19, 9));
        urgent.priority = 3;
        let report = synthesize_window(range, &[urgent], &[], None);
        assert!(report.contains("09:00 Abgabe[!]"));
    }

    #[test]
    fn habit_hint_is_injected_after_header() {
        let range = WindowRange {
            start: at(2026, 1, 19, 0),
            days: 1,
        };
        let report = synthesize_window(range, &[], &[], Some("KI-HINWEIS: Testhinweis"));
        let mut lines = report.lines();
        assert!(lines.next().is_some_and(|l| l.starts_with("SYSTEM-INFO")));
        assert_eq!(lines.next(), Some("KI-HINWEIS: Testhinweis"));
    }
}
