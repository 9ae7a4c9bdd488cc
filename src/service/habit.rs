//! Habit inference: the most frequent (weekday, time) pairing among past
//! entries on a topic. Advisory only; the hint text makes that explicit so
//! the narration layer never presents it as a confirmed entry.

use chrono::{Datelike, Timelike, Weekday};

use crate::models::entry::ScheduleEntry;

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
pub struct HabitSlot {
    pub weekday: Weekday,
    pub hour: u32,
    pub minute: u32,
}

impl HabitSlot {
    pub fn describe(&self) -> String {
        let name = WEEKDAY_NAMES[self.weekday.num_days_from_monday() as usize];
        format!("{} um {}:{:02} Uhr", name, self.hour, self.minute)
    }
}

/// Buckets matching entries by (weekday, hour, minute) and returns the most
/// frequent bucket; ties go to the bucket encountered first.
pub fn infer_habit(topic: &str, entries: &[ScheduleEntry]) -> Option<HabitSlot> {
    if topic.is_empty() {
        return None;
    }
    let topic_lower = topic.to_lowercase();
    let mut buckets: Vec<(HabitSlot, usize)> = Vec::new();
    for entry in entries {
        let Some(deadline) = entry.deadline else {
            continue;
        };
        if !entry.title.to_lowercase().contains(&topic_lower) {
            continue;
        }
        let slot = HabitSlot {
            weekday: deadline.weekday(),
            hour: deadline.hour(),
            minute: deadline.minute(),
        };
        match buckets.iter_mut().find(|(s, _)| *s == slot) {
            Some((_, count)) => *count += 1,
            None => buckets.push((slot, 1)),
        }
    }
    // Strict greater-than keeps the first-encountered bucket on ties.
    let mut best: Option<(HabitSlot, usize)> = None;
    for (slot, count) in buckets {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((slot, count));
        }
    }
    Some(best?.0)
}

/// The advisory hint line injected into the calendar fact block.
pub fn habit_hint(topic: &str, slot: HabitSlot) -> String {
    format!(
        "KI-HINWEIS: Gewohnheit erkannt: '{}' meist '{}'. Dies ist KEIN Termin, sondern nur ein Vorschlag! Wenn der Tag frei ist, schlage diesen Slot vor.",
        topic,
        slot.describe()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(id: i64, title: &str, y: i32, m: u32, d: u32, h: u32) -> ScheduleEntry {
        ScheduleEntry {
            id,
            title: title.to_string(),
            description: None,
            deadline: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, 0, 0),
            priority: 1,
            recurrence: None,
            recurrence_end: None,
            color: None,
            done: false,
            user_id: 1,
        }
    }

    #[test]
    fn most_frequent_slot_wins() {
        // Two Mondays at 18:00, one Wednesday at 9:00.
        let entries = vec![
            entry(1, "Yoga Kurs", 2026, 1, 5, 18),
            entry(2, "Yoga Kurs", 2026, 1, 12, 18),
            entry(3, "Yoga Kurs", 2026, 1, 7, 9),
        ];
        let slot = infer_habit("yoga", &entries).unwrap();
        assert_eq!(slot.weekday, Weekday::Mon);
        assert_eq!(slot.hour, 18);
        assert_eq!(slot.describe(), "Montag um 18:00 Uhr");
    }

    #[test]
    fn ties_break_toward_first_encountered() {
        let entries = vec![
            entry(1, "Yoga", 2026, 1, 7, 9),
            entry(2, "Yoga", 2026, 1, 5, 18),
        ];
        let slot = infer_habit("yoga", &entries).unwrap();
        assert_eq!(slot.weekday, Weekday::Wed);
        assert_eq!(slot.hour, 9);
    }

    #[test]
    fn no_matching_entries_means_no_habit() {
        let entries = vec![entry(1, "Zahnarzt", 2026, 1, 5, 10)];
        assert_eq!(infer_habit("yoga", &entries), None);
        assert_eq!(infer_habit("", &entries), None);
    }

    #[test]
    fn match_is_case_insensitive_substring() {
        let entries = vec![entry(1, "Abend-YOGA im Park", 2026, 1, 5, 18)];
        assert!(infer_habit("yoga", &entries).is_some());
    }
}
