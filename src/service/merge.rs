//! Cross-turn slot filling: merges the candidate extracted from the current
//! utterance into the pending candidate accumulated so far.

use crate::models::candidate::ScheduleCandidate;

/// Field-by-field merge of a new candidate `new` into the pending `pending`.
///
/// An explicit new date always overrides a stale pending one; an implicit
/// (defaulted) new date must not clobber a previously confirmed date.
/// Priority never downgrades.
pub fn merge_candidates(new: &ScheduleCandidate, pending: &ScheduleCandidate) -> ScheduleCandidate {
    let (date, date_explicit) = if new.date_explicit {
        (new.date, true)
    } else if pending.date.is_some() {
        (pending.date, pending.date_explicit)
    } else {
        (new.date, new.date_explicit)
    };

    let time = new.time.or(pending.time);

    ScheduleCandidate {
        title: new.title.clone().or_else(|| pending.title.clone()),
        date,
        date_explicit,
        time,
        time_explicit: new.time_explicit || pending.time_explicit,
        all_day: new.all_day || pending.all_day,
        priority: new.priority.max(pending.priority),
        color: new.color.or(pending.color),
        unsupported_color: new
            .unsupported_color
            .clone()
            .or_else(|| pending.unsupported_color.clone()),
        recurrence: new.recurrence.or(pending.recurrence),
        recurrence_end: new.recurrence_end.or(pending.recurrence_end),
    }
}
