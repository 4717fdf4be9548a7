//! Recurrence expansion.
//!
//! # Responsibility
//! - Turn one definition plus one window into concrete occurrence dates.
//!
//! # Invariants
//! - Output is sorted ascending and contains no duplicates.
//! - Output lies within `window ∩ [start_date, end_date]` and on dates the
//!   definition's visibility allows (before an inactivation, outside a pause).
//! - Cost is proportional to the number of produced dates, never to the
//!   distance between `start_date` and the window.

use super::window::{clamped_date, month_index, year_month, DateWindow};
use crate::model::schedule::{Frequency, ScheduleDefinition};
use chrono::{Datelike, Duration, NaiveDate};

/// Expands `definition` over `window`.
///
/// `AsNeeded` definitions expand to nothing. Inactive definitions keep their
/// occurrences before the inactivation date.
pub fn expand(definition: &ScheduleDefinition, window: DateWindow) -> Vec<NaiveDate> {
    let Some(range) = effective_range(definition, window) else {
        return Vec::new();
    };

    let anchor = definition.start_date;
    let mut dates = match definition.frequency {
        Frequency::Daily => cadence(anchor, 1, range),
        Frequency::Every2Days => cadence(anchor, 2, range),
        Frequency::Every3Days => cadence(anchor, 3, range),
        Frequency::Weekly => weekly(definition, 1, range),
        Frequency::Every2Weeks => weekly(definition, 2, range),
        Frequency::Monthly => monthly(definition, 1, range),
        Frequency::Every3Months => monthly(definition, 3, range),
        Frequency::Every6Months => monthly(definition, 6, range),
        Frequency::Yearly => yearly(definition, range),
        Frequency::AsNeeded => Vec::new(),
    };

    dates.retain(|date| definition.visibility.allows(anchor, *date));
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// First occurrence on or after `from`, looking at most `horizon_days` ahead.
pub fn next_occurrence(
    definition: &ScheduleDefinition,
    from: NaiveDate,
    horizon_days: u32,
) -> Option<NaiveDate> {
    let end = from.checked_add_signed(Duration::try_days(i64::from(horizon_days))?)?;
    let window = DateWindow::new(from, end)?;
    expand(definition, window).into_iter().next()
}

/// `window` narrowed to `[start_date, min(end_date, last generated day)]`.
///
/// A paused interval inside the range is filtered per date by `expand`.
pub fn effective_range(definition: &ScheduleDefinition, window: DateWindow) -> Option<DateWindow> {
    let upper = match (definition.end_date, definition.visibility.generation_end()) {
        (Some(end), Some(last)) => Some(end.min(last)),
        (end, last) => end.or(last),
    };
    window.clamp(definition.start_date, upper)
}

/// Dates `anchor + k * period_days` inside `range`, for any integer `k`.
///
/// The first `k` is found with a ceiling division on the offset between
/// `anchor` and `range.start()`, so `anchor` may lie on either side of it.
fn cadence(anchor: NaiveDate, period_days: i64, range: DateWindow) -> Vec<NaiveDate> {
    let offset = (range.start() - anchor).num_days();
    let steps = (offset + period_days - 1).div_euclid(period_days);
    let Some(mut current) = anchor.checked_add_signed(Duration::days(steps * period_days)) else {
        return Vec::new();
    };

    let mut dates = Vec::new();
    while current <= range.end() {
        dates.push(current);
        match current.checked_add_signed(Duration::days(period_days)) {
            Some(next) => current = next,
            None => break,
        }
    }
    dates
}

/// One stream per weekday, phased from the Monday-based week of `start_date`.
fn weekly(definition: &ScheduleDefinition, step_weeks: i64, range: DateWindow) -> Vec<NaiveDate> {
    let start = definition.start_date;
    let week_start = start - Duration::days(i64::from(start.weekday().num_days_from_monday()));
    let period = 7 * step_weeks;

    let mut weekdays = definition.days_of_week.clone();
    if weekdays.is_empty() {
        weekdays.push(start.weekday());
    }

    weekdays
        .into_iter()
        .flat_map(|weekday| {
            let base = week_start + Duration::days(i64::from(weekday.num_days_from_monday()));
            cadence(base, period, range)
        })
        .collect()
}

fn monthly(definition: &ScheduleDefinition, step_months: u32, range: DateWindow) -> Vec<NaiveDate> {
    let day = definition
        .day_of_month
        .unwrap_or_else(|| definition.start_date.day());
    let step = i64::from(step_months);
    let anchor = month_index(definition.start_date);
    let first = month_index(range.start());
    let last = month_index(range.end());

    let mut index = anchor + (first - anchor + step - 1).div_euclid(step) * step;
    let mut dates = Vec::new();
    while index <= last {
        if let Some(date) = year_month(index).and_then(|(y, m)| clamped_date(y, m, day)) {
            if range.contains(date) {
                dates.push(date);
            }
        }
        index += step;
    }
    dates
}

fn yearly(definition: &ScheduleDefinition, range: DateWindow) -> Vec<NaiveDate> {
    let month = definition.start_date.month();
    let day = definition.start_date.day();

    (range.start().year()..=range.end().year())
        .filter_map(|year| clamped_date(year, month, day))
        .filter(|date| range.contains(*date))
        .collect()
}
