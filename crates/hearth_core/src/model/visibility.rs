//! Activation state machine for schedule definitions.
//!
//! # Responsibility
//! - Model `Active <-> Inactive` transitions owned by each tool's CRUD layer.
//! - Expose which dates a definition may generate occurrences on.
//!
//! # Invariants
//! - There is no terminal state; a definition may cycle indefinitely.
//! - Deactivation on `D` stops generation for dates `>= D` only; history
//!   before `D` stays visible.
//! - Reactivation on `R` skips exactly the paused interval `[D, R)`. Only the
//!   most recent pause is tracked (`date_inactivated` + `date_reactivated`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Visibility state of one definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Visibility {
    /// Generating occurrences. After a reactivation `since` is the
    /// reactivation date and `paused_from` the inactivation it ended.
    Active {
        since: Option<NaiveDate>,
        #[serde(default)]
        paused_from: Option<NaiveDate>,
    },
    /// Not generating occurrences on or after `since` (`date_inactivated`).
    Inactive { since: NaiveDate },
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Active {
            since: None,
            paused_from: None,
        }
    }
}

/// Rejected visibility transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityError {
    AlreadyActive,
    AlreadyInactive { since: NaiveDate },
    ReactivatedBeforeInactivation {
        inactivated: NaiveDate,
        requested: NaiveDate,
    },
}

impl Display for VisibilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "definition is already active"),
            Self::AlreadyInactive { since } => {
                write!(f, "definition is already inactive since {since}")
            }
            Self::ReactivatedBeforeInactivation {
                inactivated,
                requested,
            } => write!(
                f,
                "cannot reactivate on {requested}; definition was inactivated on {inactivated}"
            ),
        }
    }
}

impl Error for VisibilityError {}

impl Visibility {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// `Active -> Inactive`, recording `date_inactivated = on`.
    pub fn deactivate(self, on: NaiveDate) -> Result<Self, VisibilityError> {
        match self {
            Self::Active { .. } => Ok(Self::Inactive { since: on }),
            Self::Inactive { since } => Err(VisibilityError::AlreadyInactive { since }),
        }
    }

    /// `Inactive -> Active`, remembering the pause `[date_inactivated, on)`.
    pub fn reactivate(self, on: NaiveDate) -> Result<Self, VisibilityError> {
        match self {
            Self::Inactive { since } if on < since => {
                Err(VisibilityError::ReactivatedBeforeInactivation {
                    inactivated: since,
                    requested: on,
                })
            }
            Self::Inactive { since } => Ok(Self::Active {
                since: Some(on),
                paused_from: Some(since),
            }),
            Self::Active { .. } => Err(VisibilityError::AlreadyActive),
        }
    }

    /// Last date generation may produce; `None` when unbounded.
    pub fn generation_end(&self) -> Option<NaiveDate> {
        match self {
            Self::Inactive { since } => Some(since.pred_opt().unwrap_or(NaiveDate::MIN)),
            Self::Active { .. } => None,
        }
    }

    /// Half-open `[from, until)` interval skipped by the last pause.
    ///
    /// A reactivation without a recorded inactivation date skips everything
    /// from `start_date`.
    pub fn paused_interval(&self, start_date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Self::Active {
                since: Some(resumed),
                paused_from,
            } => {
                let from = paused_from.unwrap_or(start_date);
                (from < *resumed).then_some((from, *resumed))
            }
            Self::Active { since: None, .. } | Self::Inactive { .. } => None,
        }
    }

    /// Whether `date` falls on a day this state allows generation for.
    pub fn allows(&self, start_date: NaiveDate, date: NaiveDate) -> bool {
        if self.generation_end().is_some_and(|end| date > end) {
            return false;
        }
        !self
            .paused_interval(start_date)
            .is_some_and(|(from, until)| from <= date && date < until)
    }

    /// `date_inactivated` column value.
    pub fn date_inactivated(&self) -> Option<NaiveDate> {
        match self {
            Self::Inactive { since } => Some(*since),
            Self::Active { paused_from, .. } => *paused_from,
        }
    }

    /// `date_reactivated` column value.
    pub fn date_reactivated(&self) -> Option<NaiveDate> {
        match self {
            Self::Active { since, .. } => *since,
            Self::Inactive { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Visibility, VisibilityError};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cycle_active_inactive_active() {
        let start = date(2025, 1, 1);
        let state = Visibility::default();
        assert!(state.allows(start, date(2030, 1, 1)));

        let state = state.deactivate(date(2025, 2, 1)).unwrap();
        assert!(!state.is_active());
        assert_eq!(state.date_inactivated(), Some(date(2025, 2, 1)));
        assert_eq!(state.generation_end(), Some(date(2025, 1, 31)));
        assert!(state.allows(start, date(2025, 1, 31)));
        assert!(!state.allows(start, date(2025, 2, 1)));

        let state = state.reactivate(date(2025, 3, 10)).unwrap();
        assert!(state.is_active());
        assert_eq!(state.date_inactivated(), Some(date(2025, 2, 1)));
        assert_eq!(state.date_reactivated(), Some(date(2025, 3, 10)));
        assert_eq!(
            state.paused_interval(start),
            Some((date(2025, 2, 1), date(2025, 3, 10)))
        );
        assert!(state.allows(start, date(2025, 1, 31)));
        assert!(!state.allows(start, date(2025, 3, 9)));
        assert!(state.allows(start, date(2025, 3, 10)));
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let active = Visibility::default();
        assert_eq!(
            active.reactivate(date(2025, 1, 1)).unwrap_err(),
            VisibilityError::AlreadyActive
        );

        let inactive = active.deactivate(date(2025, 1, 5)).unwrap();
        assert_eq!(
            inactive.deactivate(date(2025, 1, 9)).unwrap_err(),
            VisibilityError::AlreadyInactive {
                since: date(2025, 1, 5)
            }
        );
        assert!(matches!(
            inactive.reactivate(date(2025, 1, 4)),
            Err(VisibilityError::ReactivatedBeforeInactivation { .. })
        ));
    }

    #[test]
    fn reactivation_without_inactivation_date_skips_from_start() {
        let state = Visibility::Active {
            since: Some(date(2025, 3, 1)),
            paused_from: None,
        };
        assert_eq!(
            state.paused_interval(date(2025, 1, 1)),
            Some((date(2025, 1, 1), date(2025, 3, 1)))
        );
        let before_start = Visibility::Active {
            since: Some(date(2024, 6, 1)),
            paused_from: None,
        };
        assert_eq!(before_start.paused_interval(date(2025, 1, 1)), None);
    }
}
