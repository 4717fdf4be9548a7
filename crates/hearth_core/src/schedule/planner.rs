//! Window query planning.
//!
//! # Responsibility
//! - Decide which definitions are worth expanding for a request.
//! - Bound "upcoming" queries to a finite per-definition horizon.
//!
//! # Invariants
//! - Definitions of other owners, and definitions whose generated range
//!   cannot reach the window, are never expanded.
//! - Inactive definitions are expanded only for history views.
//! - Upcoming windows never extend past `today + max_horizon_days`.

use super::expander::{effective_range, expand};
use super::window::DateWindow;
use crate::model::schedule::{Occurrence, ScheduleDefinition};
use chrono::{Duration, NaiveDate};

/// Bounded replacement for the conceptual `[today, +inf)` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcomingHorizon {
    pub today: NaiveDate,
    /// Recurrence cycles to look ahead per definition (`1` = next occurrence).
    pub lookahead_cycles: u32,
    /// Hard cap on how far ahead any definition is expanded.
    pub max_horizon_days: u32,
}

impl UpcomingHorizon {
    /// Widest window any definition can be expanded over.
    pub fn outer_window(&self) -> Option<DateWindow> {
        let end = self
            .today
            .checked_add_signed(Duration::try_days(i64::from(self.max_horizon_days))?)?;
        DateWindow::new(self.today, end)
    }

    /// Per-definition lookahead window.
    ///
    /// Starts at `max(today, start_date)`, or at the reactivation date when
    /// that day falls inside a pause, so definitions starting in the future
    /// still surface their first occurrence. The span saturates at the outer
    /// window however many cycles are requested.
    pub fn window_for(&self, definition: &ScheduleDefinition) -> Option<DateWindow> {
        let cycle_days = definition.frequency.cycle_days()?;
        let outer = self.outer_window()?;

        let mut from = self.today.max(definition.start_date);
        if let Some((_, resumed)) = definition
            .visibility
            .paused_interval(definition.start_date)
            .filter(|(paused, resumed)| *paused <= from && from < *resumed)
        {
            from = resumed;
        }

        let span_days = u64::from(cycle_days)
            .saturating_mul(u64::from(self.lookahead_cycles.max(1)))
            .min(u64::from(self.max_horizon_days) + 1);
        let span = Duration::try_days(i64::try_from(span_days).ok()? - 1)?;
        let mut end = from.checked_add_signed(span)?;
        if let Some(last) = definition.visibility.generation_end() {
            end = end.min(last);
        }
        outer.clamp(from, Some(end))
    }
}

/// Pre-expansion eligibility filter.
#[derive(Debug, Clone, Copy)]
pub struct PlanScope<'a> {
    pub owner_id: &'a str,
    /// Feed queries only surface definitions opted in with "add to dashboard".
    pub require_feed_opt_in: bool,
    /// History views keep inactive definitions for dates before inactivation.
    pub include_inactive: bool,
}

impl<'a> PlanScope<'a> {
    /// Dashboard feed: active, opted-in definitions only.
    pub fn feed(owner_id: &'a str) -> Self {
        Self {
            owner_id,
            require_feed_opt_in: true,
            include_inactive: false,
        }
    }

    /// Month calendar: every definition, including inactive history.
    pub fn calendar(owner_id: &'a str) -> Self {
        Self {
            owner_id,
            require_feed_opt_in: false,
            include_inactive: true,
        }
    }
}

/// Counters for one planning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub considered: usize,
    pub expanded: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub occurrences: Vec<Occurrence>,
    pub stats: PlanStats,
}

/// Expands every eligible definition over a fixed (month) window.
pub fn plan_window(
    definitions: &[ScheduleDefinition],
    scope: PlanScope<'_>,
    window: DateWindow,
) -> Plan {
    plan_with(definitions, scope, |_| Some(window))
}

/// Expands every eligible definition over its own bounded lookahead window.
pub fn plan_upcoming(
    definitions: &[ScheduleDefinition],
    scope: PlanScope<'_>,
    horizon: &UpcomingHorizon,
) -> Plan {
    plan_with(definitions, scope, |definition| horizon.window_for(definition))
}

fn plan_with(
    definitions: &[ScheduleDefinition],
    scope: PlanScope<'_>,
    window_for: impl Fn(&ScheduleDefinition) -> Option<DateWindow>,
) -> Plan {
    let mut plan = Plan::default();

    for definition in definitions {
        plan.stats.considered += 1;

        if !is_eligible(definition, scope) {
            plan.stats.skipped += 1;
            continue;
        }
        let Some(window) = window_for(definition) else {
            plan.stats.skipped += 1;
            continue;
        };
        if effective_range(definition, window).is_none() {
            plan.stats.skipped += 1;
            continue;
        }

        plan.stats.expanded += 1;
        plan.occurrences.extend(
            expand(definition, window)
                .into_iter()
                .map(|due_date| Occurrence::from_definition(definition, due_date)),
        );
    }

    plan
}

fn is_eligible(definition: &ScheduleDefinition, scope: PlanScope<'_>) -> bool {
    definition.owner_id == scope.owner_id
        && (scope.include_inactive || definition.is_active())
        && (!scope.require_feed_opt_in || definition.include_in_feed)
}

#[cfg(test)]
mod tests {
    use super::{plan_upcoming, plan_window, PlanScope, UpcomingHorizon};
    use crate::model::schedule::{Frequency, ScheduleDefinition, SourceTool};
    use crate::model::visibility::Visibility;
    use crate::schedule::window::DateWindow;
    use chrono::{NaiveDate, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn definition(frequency: Frequency, start: NaiveDate) -> ScheduleDefinition {
        ScheduleDefinition::new("house-1", SourceTool::CarePlan, "Walk", frequency, start)
    }

    fn scope(feed: bool) -> PlanScope<'static> {
        if feed {
            PlanScope::feed("house-1")
        } else {
            PlanScope::calendar("house-1")
        }
    }

    #[test]
    fn skips_ineligible_definitions_before_expanding() {
        let active = definition(Frequency::Daily, date(2025, 1, 1));
        let mut other_owner = definition(Frequency::Daily, date(2025, 1, 1));
        other_owner.owner_id = "house-2".to_string();
        let mut inactive = definition(Frequency::Daily, date(2025, 1, 1));
        inactive.visibility = Visibility::Inactive {
            since: date(2025, 1, 2),
        };
        let mut ended = definition(Frequency::Daily, date(2024, 1, 1));
        ended.end_date = Some(date(2024, 6, 1));
        let mut hidden = definition(Frequency::Daily, date(2025, 1, 1));
        hidden.include_in_feed = false;

        let defs = vec![active, other_owner, inactive, ended, hidden];
        let march = DateWindow::month(2025, 3).unwrap();

        let calendar = plan_window(&defs, scope(false), march);
        assert_eq!(calendar.stats.considered, 5);
        assert_eq!(calendar.stats.expanded, 2);
        assert_eq!(calendar.stats.skipped, 3);
        assert_eq!(calendar.occurrences.len(), 62);

        let feed = plan_window(&defs, scope(true), march);
        assert_eq!(feed.stats.expanded, 1);
        assert_eq!(feed.occurrences.len(), 31);
    }

    #[test]
    fn upcoming_takes_one_cycle_per_definition() {
        let mut weekly = definition(Frequency::Weekly, date(2025, 1, 6));
        weekly.days_of_week = vec![Weekday::Mon, Weekday::Thu];
        let yearly = definition(Frequency::Yearly, date(2020, 7, 4));
        let as_needed = definition(Frequency::AsNeeded, date(2025, 1, 1));

        let horizon = UpcomingHorizon {
            today: date(2025, 3, 4),
            lookahead_cycles: 1,
            max_horizon_days: 366,
        };
        let plan = plan_upcoming(&[weekly, yearly, as_needed], scope(true), &horizon);

        let dates = plan
            .occurrences
            .iter()
            .map(|occurrence| occurrence.due_date)
            .collect::<Vec<_>>();
        assert_eq!(
            dates,
            vec![date(2025, 3, 6), date(2025, 3, 10), date(2025, 7, 4)]
        );
        assert_eq!(plan.stats.skipped, 1);
    }

    #[test]
    fn upcoming_respects_max_horizon() {
        let far = definition(Frequency::Monthly, date(2027, 1, 15));
        let horizon = UpcomingHorizon {
            today: date(2025, 3, 4),
            lookahead_cycles: 1,
            max_horizon_days: 90,
        };
        let plan = plan_upcoming(&[far], scope(true), &horizon);
        assert!(plan.occurrences.is_empty());
        assert_eq!(plan.stats.skipped, 1);
    }

    #[test]
    fn calendar_keeps_history_of_inactive_definitions() {
        let mut paused = definition(Frequency::Daily, date(2025, 1, 1));
        paused.visibility = Visibility::Inactive {
            since: date(2025, 1, 10),
        };
        let january = DateWindow::month(2025, 1).unwrap();

        let calendar = plan_window(std::slice::from_ref(&paused), scope(false), january);
        assert_eq!(calendar.occurrences.len(), 9);
        assert_eq!(
            calendar.occurrences.last().map(|o| o.due_date),
            Some(date(2025, 1, 9))
        );

        let feed = plan_window(&[paused], scope(true), january);
        assert!(feed.occurrences.is_empty());
        assert_eq!(feed.stats.skipped, 1);
    }

    #[test]
    fn huge_lookahead_saturates_at_max_horizon() {
        let yearly = definition(Frequency::Yearly, date(2020, 7, 4));
        let horizon = UpcomingHorizon {
            today: date(2025, 3, 4),
            lookahead_cycles: u32::MAX,
            max_horizon_days: 366,
        };
        let plan = plan_upcoming(std::slice::from_ref(&yearly), scope(true), &horizon);
        let dates = plan
            .occurrences
            .iter()
            .map(|occurrence| occurrence.due_date)
            .collect::<Vec<_>>();
        assert_eq!(dates, vec![date(2025, 7, 4)]);

        let unbounded = UpcomingHorizon {
            max_horizon_days: u32::MAX,
            ..horizon
        };
        assert!(unbounded.window_for(&yearly).is_none());
    }

    #[test]
    fn upcoming_window_skips_paused_interval() {
        let mut weekly = definition(Frequency::Weekly, date(2025, 1, 6));
        weekly.visibility = Visibility::Active {
            since: Some(date(2025, 3, 17)),
            paused_from: Some(date(2025, 2, 1)),
        };
        let horizon = UpcomingHorizon {
            today: date(2025, 3, 4),
            lookahead_cycles: 1,
            max_horizon_days: 366,
        };
        let window = horizon.window_for(&weekly).unwrap();
        assert_eq!(window.start(), date(2025, 3, 17));
        assert_eq!(window.end(), date(2025, 3, 23));
    }
}
