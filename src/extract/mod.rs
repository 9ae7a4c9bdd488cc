//! Turns one free-form German utterance into a `ScheduleCandidate`.
//! Pure and deterministic: the same `(text, now)` always yields the same
//! candidate, with no I/O and no randomness.

pub mod dates;
pub mod stopwords;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::stopwords::{
    MONTHS, NIGHT_WORDS, PM_WORDS, STOP_WORDS, UNSUPPORTED_COLORS, URGENT_WORDS, WEEKDAYS,
};
use crate::models::candidate::{RecurrenceEnd, ScheduleCandidate};
use crate::models::entry::{EntryColor, Recurrence};

pub fn extract(text: &str, now: NaiveDateTime) -> ScheduleCandidate {
    let lower = text.to_lowercase();

    let priority = detect_priority(&lower);
    let (color, unsupported_color) = detect_color(&lower);
    let recurrence = detect_recurrence(&lower);
    let recurrence_end = recurrence.and_then(|r| detect_recurrence_end(&lower, r, now));

    let resolved = dates::resolve_date(&lower, now);
    let mut date = resolved.map(|r| r.date);
    let date_explicit = resolved.map(|r| r.explicit).unwrap_or(false);

    let time = resolve_time(&lower).map(|(h, m)| shift_into_evening(&lower, h, m));
    let time_explicit = time.is_some();

    // A time with no date means today if the moment is still ahead, else
    // tomorrow. The date stays implicit so a later explicit one wins.
    if date.is_none() {
        if let Some((hour, minute)) = time {
            if let Some(t) = NaiveTime::from_hms_opt(hour, minute, 0) {
                let candidate = now.date().and_time(t);
                date = Some(if candidate < now {
                    now.date() + Duration::days(1)
                } else {
                    now.date()
                });
            }
        }
    }

    ScheduleCandidate {
        title: extract_title(&lower),
        date,
        date_explicit,
        time,
        time_explicit,
        all_day: false,
        priority,
        color,
        unsupported_color,
        recurrence,
        recurrence_end,
    }
}

fn detect_priority(lower: &str) -> u8 {
    if URGENT_WORDS.iter().any(|w| lower.contains(w)) {
        3
    } else if lower.contains("mittel") || lower.contains("normale priorität") {
        2
    } else {
        1
    }
}

static VALID_COLOR_RES: Lazy<Vec<(EntryColor, Regex)>> = Lazy::new(|| {
    [
        EntryColor::Rot,
        EntryColor::Gruen,
        EntryColor::Blau,
        EntryColor::Gelb,
    ]
    .into_iter()
    .map(|c| (c, Regex::new(&format!(r"\b{}\b", c.as_str())).unwrap()))
    .collect()
});

static UNSUPPORTED_COLOR_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    UNSUPPORTED_COLORS
        .iter()
        .map(|&c| (c, Regex::new(&format!(r"\b{c}\b")).unwrap()))
        .collect()
});

fn detect_color(lower: &str) -> (Option<EntryColor>, Option<String>) {
    for (color, re) in VALID_COLOR_RES.iter() {
        if re.is_match(lower) {
            return (Some(*color), None);
        }
    }
    for (name, re) in UNSUPPORTED_COLOR_RES.iter() {
        if re.is_match(lower) {
            return (None, Some((*name).to_string()));
        }
    }
    (None, None)
}

fn detect_recurrence(lower: &str) -> Option<Recurrence> {
    if lower.contains("täglich") || lower.contains("jeden tag") {
        return Some(Recurrence::Daily);
    }
    let weekly = lower.contains("wöchentlich")
        || lower.contains("jede woche")
        || WEEKDAYS
            .iter()
            .any(|wd| lower.contains(&format!("jeden {wd}")));
    if weekly {
        return Some(Recurrence::Weekly);
    }
    if lower.contains("monatlich") || lower.contains("jeden monat") {
        return Some(Recurrence::Monthly);
    }
    None
}

static RECURRENCE_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"bis\s+(?:zum\s+)?(\d{1,2})\.(\d{1,2})\.?(\d{2,4})?").unwrap());
static FOR_WEEKS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"für\s+(\d+)\s+wochen?").unwrap());

fn detect_recurrence_end(
    lower: &str,
    recurrence: Recurrence,
    now: NaiveDateTime,
) -> Option<RecurrenceEnd> {
    // A "für N wochen" duration on a weekly series wins over a "bis" date;
    // it stays symbolic until the start timestamp exists.
    if recurrence == Recurrence::Weekly {
        if let Some(caps) = FOR_WEEKS_RE.captures(lower) {
            if let Ok(weeks) = caps[1].parse() {
                return Some(RecurrenceEnd::Weeks(weeks));
            }
        }
    }
    let caps = RECURRENCE_END_RE.captures(lower)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let explicit_year = caps.get(3).and_then(|m| m.as_str().parse::<i32>().ok());
    let mut year = explicit_year.unwrap_or_else(|| chrono::Datelike::year(&now));
    if year < 100 {
        year += 2000;
    }
    let mut end = chrono::NaiveDate::from_ymd_opt(year, month, day)?;
    // Without a year, an end date already behind us means next year.
    if explicit_year.is_none() && end.and_hms_opt(23, 59, 59)? < now {
        end = chrono::NaiveDate::from_ymd_opt(year + 1, month, day)?;
    }
    Some(RecurrenceEnd::Date(end))
}

static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})[:.](\d{2})").unwrap());
static UHR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})\s*uhr").unwrap());

/// `H:MM` / `H.MM`, guarded so fragments of a dotted date never read as a
/// time (`12.01.2026` must not yield 12:01). The regex crate has no
/// lookaround, so the boundaries are checked byte-wise around each match.
fn resolve_time(lower: &str) -> Option<(u32, u32)> {
    let bytes = lower.as_bytes();
    for caps in TIME_RE.captures_iter(lower) {
        let whole = caps.get(0)?;
        if whole.start() > 0 {
            let prev = bytes[whole.start() - 1];
            if prev.is_ascii_digit() || prev == b'.' {
                continue;
            }
        }
        if bytes.get(whole.end()) == Some(&b'.')
            && bytes.get(whole.end() + 1).is_some_and(u8::is_ascii_digit)
        {
            continue;
        }
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        return (hour <= 23 && minute <= 59).then_some((hour, minute));
    }
    let caps = UHR_RE.captures(lower)?;
    let hour: u32 = caps[1].parse().ok()?;
    (hour <= 23).then_some((hour, 0))
}

/// "um 8 abends" means 20:00; night phrasing remaps 6-11 into the evening
/// and midnight-as-12 to 0.
fn shift_into_evening(lower: &str, hour: u32, minute: u32) -> (u32, u32) {
    let is_pm = PM_WORDS.iter().any(|w| lower.contains(w));
    let is_night = NIGHT_WORDS.iter().any(|w| lower.contains(w));
    let shifted = if is_pm && hour < 12 {
        hour + 12
    } else if is_night {
        match hour {
            6..=11 => hour + 12,
            12 => 0,
            _ => hour,
        }
    } else {
        hour
    };
    (shifted, minute)
}

static TIME_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2}[:.]\d{2}").unwrap());
static UHR_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2}\s*uhr").unwrap());
static DATE_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2}\.\d{1,2}\.?").unwrap());

/// Strips every recognized temporal substring and the stop-word table, then
/// treats the residue as the title. More than four residual tokens is more
/// likely noise than a title, so the extraction reports none at all.
fn extract_title(lower: &str) -> Option<String> {
    let clean = TIME_STRIP_RE.replace_all(lower, "");
    let clean = UHR_STRIP_RE.replace_all(&clean, "");
    let clean = DATE_STRIP_RE.replace_all(&clean, "");
    let mut clean = clean
        .replace('.', " ")
        .replace(',', " ")
        .replace('!', " ")
        .replace('?', " ")
        .replace('\'', "")
        .replace('"', "");
    for (name, _) in MONTHS {
        clean = clean.replace(name, "");
    }

    let words: Vec<&str> = clean
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w) && !w.chars().all(|c| c.is_ascii_digit()))
        .collect();

    if words.is_empty() || words.len() > 4 {
        return None;
    }
    Some(
        words
            .iter()
            .map(|w| capitalize(w))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
