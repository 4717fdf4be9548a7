//! Schedule definition and one-off entry model.
//!
//! # Responsibility
//! - Define the canonical record every tool's recurring item maps onto.
//! - Define closed enums for frequency, tool, priority and status.
//! - Validate field combinations before materialization reads them.
//!
//! # Invariants
//! - `id` is stable and never nil.
//! - `end_date` is never earlier than `start_date` when set.
//! - `day_of_month` stays within `1..=31` when set.

use super::visibility::Visibility;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier owned by the source tool.
pub type DefinitionId = Uuid;

/// Household/user scope identifier.
pub type OwnerId = String;

/// Household tool that produced a definition or entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTool {
    /// Pet care plan item.
    CarePlan,
    /// To-do routine or task.
    Todo,
    /// Calendar event series.
    CalendarEvent,
    /// Dated appointment.
    Appointment,
}

impl SourceTool {
    pub const ALL: [SourceTool; 4] = [
        SourceTool::CarePlan,
        SourceTool::Todo,
        SourceTool::CalendarEvent,
        SourceTool::Appointment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CarePlan => "care_plan",
            Self::Todo => "todo",
            Self::CalendarEvent => "calendar_event",
            Self::Appointment => "appointment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "care_plan" => Some(Self::CarePlan),
            "todo" => Some(Self::Todo),
            "calendar_event" => Some(Self::CalendarEvent),
            "appointment" => Some(Self::Appointment),
            _ => None,
        }
    }
}

impl Display for SourceTool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed recurrence enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "every_2_days")]
    Every2Days,
    #[serde(rename = "every_3_days")]
    Every3Days,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "every_2_weeks")]
    Every2Weeks,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "every_3_months")]
    Every3Months,
    #[serde(rename = "every_6_months")]
    Every6Months,
    #[serde(rename = "yearly")]
    Yearly,
    /// Never auto-generates occurrences.
    #[serde(rename = "as_needed")]
    AsNeeded,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Every2Days => "every_2_days",
            Self::Every3Days => "every_3_days",
            Self::Weekly => "weekly",
            Self::Every2Weeks => "every_2_weeks",
            Self::Monthly => "monthly",
            Self::Every3Months => "every_3_months",
            Self::Every6Months => "every_6_months",
            Self::Yearly => "yearly",
            Self::AsNeeded => "as_needed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "every_2_days" => Some(Self::Every2Days),
            "every_3_days" => Some(Self::Every3Days),
            "weekly" => Some(Self::Weekly),
            "every_2_weeks" => Some(Self::Every2Weeks),
            "monthly" => Some(Self::Monthly),
            "every_3_months" => Some(Self::Every3Months),
            "every_6_months" => Some(Self::Every6Months),
            "yearly" => Some(Self::Yearly),
            "as_needed" => Some(Self::AsNeeded),
            _ => None,
        }
    }

    /// Upper bound, in days, of the gap between two consecutive occurrences.
    ///
    /// `None` for `AsNeeded`, which has no cycle.
    pub fn cycle_days(self) -> Option<u32> {
        match self {
            Self::Daily => Some(1),
            Self::Every2Days => Some(2),
            Self::Every3Days => Some(3),
            Self::Weekly => Some(7),
            Self::Every2Weeks => Some(14),
            Self::Monthly => Some(31),
            Self::Every3Months => Some(92),
            Self::Every6Months => Some(184),
            Self::Yearly => Some(366),
            Self::AsNeeded => None,
        }
    }
}

/// Sort tie-break ordinal. Declaration order is the `Ord` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Item status owned by the source tool and passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Completed,
    Skipped,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// Field-level validation errors for definitions and one-off entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    NilId,
    EmptyOwner,
    EmptyTitle,
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    DayOfMonthOutOfRange(u32),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "id must not be nil"),
            Self::EmptyOwner => write!(f, "owner_id must not be empty"),
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::InvalidDateRange { start, end } => {
                write!(f, "end_date ({end}) must be >= start_date ({start})")
            }
            Self::DayOfMonthOutOfRange(day) => {
                write!(f, "day_of_month ({day}) must be within 1..=31")
            }
        }
    }
}

impl Error for ModelValidationError {}

/// Tool-owned description of something that recurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    pub id: DefinitionId,
    pub owner_id: OwnerId,
    pub source_tool: SourceTool,
    pub title: String,
    pub notes: Option<String>,
    pub frequency: Frequency,
    /// Meaningful for `Weekly` and `Every2Weeks`. Empty means the weekday of
    /// `start_date`.
    pub days_of_week: Vec<Weekday>,
    /// Meaningful for the monthly variants. `None` means the day of
    /// `start_date`.
    pub day_of_month: Option<u32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub visibility: Visibility,
    /// "Add to dashboard" opt-in.
    pub include_in_feed: bool,
    pub priority: Priority,
    pub status: ItemStatus,
}

impl ScheduleDefinition {
    /// Creates an active, feed-visible, medium-priority pending definition.
    pub fn new(
        owner_id: impl Into<OwnerId>,
        source_tool: SourceTool,
        title: impl Into<String>,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            source_tool,
            title: title.into(),
            notes: None,
            frequency,
            days_of_week: Vec::new(),
            day_of_month: None,
            start_date,
            end_date: None,
            visibility: Visibility::default(),
            include_in_feed: true,
            priority: Priority::Medium,
            status: ItemStatus::Pending,
        }
    }

    pub fn is_active(&self) -> bool {
        self.visibility.is_active()
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_common(self.id, &self.owner_id, &self.title)?;
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ModelValidationError::InvalidDateRange {
                    start: self.start_date,
                    end,
                });
            }
        }
        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(ModelValidationError::DayOfMonthOutOfRange(day));
            }
        }
        Ok(())
    }
}

/// Single dated item without a recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneOffEntry {
    pub id: DefinitionId,
    pub owner_id: OwnerId,
    pub source_tool: SourceTool,
    pub title: String,
    pub notes: Option<String>,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub status: ItemStatus,
}

impl OneOffEntry {
    pub fn new(
        owner_id: impl Into<OwnerId>,
        source_tool: SourceTool,
        title: impl Into<String>,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            source_tool,
            title: title.into(),
            notes: None,
            due_date,
            priority: Priority::Medium,
            status: ItemStatus::Pending,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_common(self.id, &self.owner_id, &self.title)
    }
}

/// One concrete date derived from a definition. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub definition_id: DefinitionId,
    pub source_tool: SourceTool,
    pub title: String,
    pub notes: Option<String>,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub status: ItemStatus,
}

impl Occurrence {
    pub fn from_definition(definition: &ScheduleDefinition, due_date: NaiveDate) -> Self {
        Self {
            definition_id: definition.id,
            source_tool: definition.source_tool,
            title: definition.title.clone(),
            notes: definition.notes.clone(),
            due_date,
            priority: definition.priority,
            status: definition.status,
        }
    }
}

fn validate_common(id: Uuid, owner_id: &str, title: &str) -> Result<(), ModelValidationError> {
    if id.is_nil() {
        return Err(ModelValidationError::NilId);
    }
    if owner_id.trim().is_empty() {
        return Err(ModelValidationError::EmptyOwner);
    }
    if title.trim().is_empty() {
        return Err(ModelValidationError::EmptyTitle);
    }
    Ok(())
}
