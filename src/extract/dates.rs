//! Ordered date-resolution rules. Each rule is a named pure function
//! returning an optional resolved date; the first success wins. The order is
//! load-bearing: explicit day.month beats relative keywords, the weaker
//! bare-day heuristics only fire when nothing stronger matched, and weekday
//! names come last.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::stopwords::{MONTHS, WEEKDAYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub explicit: bool,
}

impl ResolvedDate {
    fn explicit(date: NaiveDate) -> Self {
        Self {
            date,
            explicit: true,
        }
    }
}

type DateRule = fn(&str, NaiveDateTime) -> Option<ResolvedDate>;

const DATE_RULES: &[(&str, DateRule)] = &[
    ("explicit-day-month", explicit_day_month),
    ("relative-keyword", relative_keyword),
    ("relative-offset", relative_offset),
    ("bare-day", bare_day),
    ("am-day-without-dot", am_day_without_dot),
    ("day-with-month-name", day_with_month_name),
    ("weekday-name", weekday_name),
];

/// Runs the rules in order against lowercased text.
pub fn resolve_date(text: &str, now: NaiveDateTime) -> Option<ResolvedDate> {
    for (name, rule) in DATE_RULES {
        if let Some(found) = rule(text, now) {
            tracing::debug!(rule = name, date = %found.date, "date rule matched");
            return Some(found);
        }
        tracing::trace!(rule = name, "date rule rejected");
    }
    None
}

static DAY_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.?(\d{2,4})?").unwrap());

/// `21.3.`, `21.03.2026`, two-digit years map into the 2000s.
fn explicit_day_month(text: &str, now: NaiveDateTime) -> Option<ResolvedDate> {
    let caps = DAY_MONTH_RE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps
        .get(3)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or_else(|| now.year());
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day).map(ResolvedDate::explicit)
}

static MORGEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(morgen|moregn|morgne|morgn|tomorrow|mrgn)\b").unwrap());

/// übermorgen / morgen / heute, including common misspellings.
fn relative_keyword(text: &str, now: NaiveDateTime) -> Option<ResolvedDate> {
    let today = now.date();
    if ["übermorgen", "uebermorgen", "über morgen"]
        .iter()
        .any(|k| text.contains(k))
    {
        return Some(ResolvedDate::explicit(today + Duration::days(2)));
    }
    if MORGEN_RE.is_match(text) {
        return Some(ResolvedDate::explicit(today + Duration::days(1)));
    }
    if ["heute", "huete", "today", "heut"]
        .iter()
        .any(|k| text.contains(k))
    {
        return Some(ResolvedDate::explicit(today));
    }
    None
}

static IN_DAYS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"in\s+(\d+)\s+tag").unwrap());
static IN_WEEKS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"in\s+(\d+)\s+woche").unwrap());

/// `in N tagen`, `in N wochen`, and the bare "nächste woche" when no
/// weekday narrows it down.
fn relative_offset(text: &str, now: NaiveDateTime) -> Option<ResolvedDate> {
    let today = now.date();
    let week_phrase = ["in einer woche", "nächste woche", "naechste woche"]
        .iter()
        .any(|k| text.contains(k));
    if week_phrase && !WEEKDAYS.iter().any(|wd| text.contains(wd)) {
        return Some(ResolvedDate::explicit(today + Duration::weeks(1)));
    }
    if let Some(caps) = IN_WEEKS_RE.captures(text) {
        let weeks: i64 = caps[1].parse().ok()?;
        return Some(ResolvedDate::explicit(today + Duration::weeks(weeks)));
    }
    if let Some(caps) = IN_DAYS_RE.captures(text) {
        let days: i64 = caps[1].parse().ok()?;
        return Some(ResolvedDate::explicit(today + Duration::days(days)));
    }
    None
}

static BARE_DAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2})\.").unwrap());

/// `am 21.` with no month: assume the current month, roll into the next one
/// if that day is already in the past. The trailing-digit check keeps day
/// fragments of `21.3.` from matching here.
fn bare_day(text: &str, now: NaiveDateTime) -> Option<ResolvedDate> {
    let bytes = text.as_bytes();
    let caps = BARE_DAY_RE
        .captures_iter(text)
        .find(|caps| match caps.get(0) {
            Some(m) => !bytes.get(m.end()).is_some_and(u8::is_ascii_digit),
            None => false,
        })?;
    let day: u32 = caps[1].parse().ok()?;
    day_in_current_or_next_month(day, now).map(ResolvedDate::explicit)
}

static AM_DAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bam\s+(\d{1,2})\b").unwrap());

/// `am 21` without any dot, the weakest numeric form.
fn am_day_without_dot(text: &str, now: NaiveDateTime) -> Option<ResolvedDate> {
    let caps = AM_DAY_RE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    day_in_current_or_next_month(day, now).map(ResolvedDate::explicit)
}

fn day_in_current_or_next_month(day: u32, now: NaiveDateTime) -> Option<NaiveDate> {
    let candidate = NaiveDate::from_ymd_opt(now.year(), now.month(), day)?;
    if candidate >= now.date() {
        return Some(candidate);
    }
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

static MONTH_NAME_RES: Lazy<Vec<(&'static str, u32, Regex)>> = Lazy::new(|| {
    MONTHS
        .iter()
        .map(|&(name, num)| {
            let re = Regex::new(&format!(r"(\d{{1,2}})\.?\s*{name}")).unwrap();
            (name, num, re)
        })
        .collect()
});

/// `5. märz` style; the first month name mentioned decides, and a date
/// already behind us rolls into the next year.
fn day_with_month_name(text: &str, now: NaiveDateTime) -> Option<ResolvedDate> {
    let (_, month, re) = MONTH_NAME_RES.iter().find(|(name, _, _)| text.contains(name))?;
    let caps = re.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let candidate = NaiveDate::from_ymd_opt(now.year(), *month, day)?;
    let date = if candidate < now.date() {
        NaiveDate::from_ymd_opt(now.year() + 1, *month, day)?
    } else {
        candidate
    };
    Some(ResolvedDate::explicit(date))
}

/// Named weekday resolves to its next occurrence, never today.
fn weekday_name(text: &str, now: NaiveDateTime) -> Option<ResolvedDate> {
    let index = WEEKDAYS.iter().position(|wd| text.contains(wd))?;
    let today_index = now.weekday().num_days_from_monday() as i64;
    let mut days_ahead = (index as i64 - today_index).rem_euclid(7);
    if days_ahead == 0 {
        days_ahead = 7;
    }
    Some(ResolvedDate::explicit(
        now.date() + Duration::days(days_ahead),
    ))
}
