//! Core schedule materialization for Hearth.
//! Turns tool-owned schedule definitions into one ordered action feed.

pub mod api;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;

pub use api::{
    get_calendar, get_feed, ApiError, CalendarParams, CalendarResponse, ErrorBody, FeedParams,
    FeedResponse,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::schedule::{
    DefinitionId, Frequency, ItemStatus, ModelValidationError, Occurrence, OneOffEntry, OwnerId,
    Priority, ScheduleDefinition, SourceTool,
};
pub use model::visibility::{Visibility, VisibilityError};
pub use repo::definition_repo::{
    DefinitionRepository, RepoError, RepoResult, SqliteDefinitionRepository,
};
pub use repo::one_off_repo::{OneOffRepository, SqliteOneOffRepository};
pub use schedule::aggregator::{aggregate, ActionItem, AggregateFilter, ItemKind};
pub use schedule::expander::{expand, next_occurrence};
pub use schedule::planner::{plan_upcoming, plan_window, PlanScope, PlanStats, UpcomingHorizon};
pub use schedule::window::DateWindow;
pub use service::materialize::{
    CalendarQuery, FeedQuery, MaterializationService, MaterializeConfig, Materialized,
    ServiceError,
};

/// Answer printed by `hearth ping` to show the binary links this core.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
