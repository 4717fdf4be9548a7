//! Inclusive date windows and calendar helpers.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Inclusive `[start, end]` date range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Returns `None` when `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// `[first of month, last of month]`, or `None` for an invalid month.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let last = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))?;
        Self::new(first, last)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Narrows the window to `[lower, upper]`; `upper = None` is unbounded.
    pub fn clamp(&self, lower: NaiveDate, upper: Option<NaiveDate>) -> Option<Self> {
        let start = self.start.max(lower);
        let end = match upper {
            Some(upper) => self.end.min(upper),
            None => self.end,
        };
        Self::new(start, end)
    }

    /// Number of days covered, inclusive.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Days in `month` (1-based). Returns 0 for months outside `1..=12`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// `day` in the given month, clamped to the month's last day.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
}

/// Months since year 0, used for month-step arithmetic.
pub(crate) fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Inverse of `month_index` as `(year, month)` with a 1-based month.
pub(crate) fn year_month(index: i64) -> Option<(i32, u32)> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    Some((year, month))
}

#[cfg(test)]
mod tests {
    use super::{clamped_date, days_in_month, month_index, year_month, DateWindow};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_window_covers_whole_month() {
        let feb = DateWindow::month(2024, 2).unwrap();
        assert_eq!(feb.start(), date(2024, 2, 1));
        assert_eq!(feb.end(), date(2024, 2, 29));
        assert_eq!(feb.len_days(), 29);
        assert!(DateWindow::month(2024, 13).is_none());
    }

    #[test]
    fn new_rejects_reversed_bounds() {
        assert!(DateWindow::new(date(2025, 1, 2), date(2025, 1, 1)).is_none());
    }

    #[test]
    fn clamp_narrows_or_rejects() {
        let window = DateWindow::month(2025, 3).unwrap();
        let clamped = window
            .clamp(date(2025, 3, 10), Some(date(2025, 3, 20)))
            .unwrap();
        assert_eq!(clamped.start(), date(2025, 3, 10));
        assert_eq!(clamped.end(), date(2025, 3, 20));
        assert!(window.clamp(date(2025, 4, 1), None).is_none());
        assert!(window
            .clamp(date(2025, 1, 1), Some(date(2025, 2, 28)))
            .is_none());
    }

    #[test]
    fn clamped_date_handles_short_months() {
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(clamped_date(2024, 2, 31), Some(date(2024, 2, 29)));
        assert_eq!(clamped_date(2025, 4, 31), Some(date(2025, 4, 30)));
    }

    #[test]
    fn month_index_roundtrip() {
        let index = month_index(date(2025, 12, 5));
        assert_eq!(year_month(index), Some((2025, 12)));
        assert_eq!(year_month(index + 1), Some((2026, 1)));
    }
}
