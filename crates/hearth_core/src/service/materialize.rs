//! Request-scoped materialization pipeline.
//!
//! # Responsibility
//! - Fan repository reads out concurrently and join them before merging.
//! - Run planner and aggregator over the joined snapshot.
//!
//! # Invariants
//! - The service holds no state between requests besides its repositories.
//! - A failing, panicking or slow tool read degrades to an empty
//!   contribution; the request still succeeds.
//! - A cancelled request returns `ServiceError::Cancelled` and never a
//!   partial result.

use crate::model::schedule::{ItemStatus, OneOffEntry, ScheduleDefinition, SourceTool};
use crate::repo::definition_repo::{
    definition_table, DefinitionRepository, RepoResult, SqliteDefinitionRepository,
};
use crate::repo::one_off_repo::{one_off_table, OneOffRepository, SqliteOneOffRepository};
use crate::schedule::aggregator::{aggregate, ActionItem, AggregateFilter};
use crate::schedule::planner::{plan_upcoming, plan_window, PlanScope, PlanStats, UpcomingHorizon};
use crate::schedule::window::DateWindow;
use chrono::{Duration as DateSpan, NaiveDate};
use futures::future::join_all;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Tunables for one service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeConfig {
    /// Budget for a single tool read before it is treated as failed.
    pub read_timeout: Duration,
    /// Cycles looked ahead per definition for the feed.
    pub lookahead_cycles: u32,
    /// Hard cap on how far the feed looks ahead.
    pub max_horizon_days: u32,
    /// How far back pending one-off entries still surface as overdue.
    pub overdue_lookback_days: u32,
    pub default_feed_limit: usize,
    pub max_feed_limit: usize,
}

impl Default for MaterializeConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(2),
            lookahead_cycles: 1,
            max_horizon_days: 366,
            overdue_lookback_days: 30,
            default_feed_limit: 50,
            max_feed_limit: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The owning request was cancelled before all reads joined.
    Cancelled,
    /// The requested window cannot be represented.
    WindowOutOfRange,
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "request cancelled before reads completed"),
            Self::WindowOutOfRange => write!(f, "requested window is out of range"),
        }
    }
}

impl Error for ServiceError {}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Validated dashboard feed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub owner_id: String,
    pub status: Option<ItemStatus>,
    pub limit: usize,
}

/// Validated month calendar query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarQuery {
    pub owner_id: String,
    pub window: DateWindow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub items: Vec<ActionItem>,
    /// Tools whose contribution was replaced by an empty one.
    pub degraded_tools: Vec<SourceTool>,
    pub stats: PlanStats,
}

struct Snapshot {
    definitions: Vec<ScheduleDefinition>,
    one_offs: Vec<OneOffEntry>,
    degraded_tools: Vec<SourceTool>,
}

struct Contribution<T> {
    tool: SourceTool,
    rows: Vec<T>,
    degraded: bool,
}

/// Stateless materialization service over per-tool repositories.
#[derive(Clone, Default)]
pub struct MaterializationService {
    definitions: Vec<Arc<dyn DefinitionRepository>>,
    one_offs: Vec<Arc<dyn OneOffRepository>>,
    config: MaterializeConfig,
}

impl MaterializationService {
    pub fn new(config: MaterializeConfig) -> Self {
        Self {
            definitions: Vec::new(),
            one_offs: Vec::new(),
            config,
        }
    }

    /// Registers SQLite repositories for every tool table in `db_path`.
    pub fn sqlite(db_path: impl AsRef<Path>, config: MaterializeConfig) -> Self {
        let db_path = db_path.as_ref();
        let mut service = Self::new(config);
        for tool in SourceTool::ALL {
            if definition_table(tool).is_some() {
                service = service.with_definitions(Arc::new(SqliteDefinitionRepository::new(
                    db_path, tool,
                )));
            }
            if one_off_table(tool).is_some() {
                service =
                    service.with_one_offs(Arc::new(SqliteOneOffRepository::new(db_path, tool)));
            }
        }
        service
    }

    pub fn with_definitions(mut self, repo: Arc<dyn DefinitionRepository>) -> Self {
        self.definitions.push(repo);
        self
    }

    pub fn with_one_offs(mut self, repo: Arc<dyn OneOffRepository>) -> Self {
        self.one_offs.push(repo);
        self
    }

    pub fn config(&self) -> &MaterializeConfig {
        &self.config
    }

    /// Upcoming action items across all tools, for the dashboard.
    pub async fn feed(
        &self,
        query: &FeedQuery,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> ServiceResult<Materialized> {
        let started_at = Instant::now();
        let horizon = UpcomingHorizon {
            today,
            lookahead_cycles: self.config.lookahead_cycles,
            max_horizon_days: self.config.max_horizon_days,
        };
        let outer = horizon
            .outer_window()
            .ok_or(ServiceError::WindowOutOfRange)?;
        let lookback_start = today
            .checked_sub_signed(
                DateSpan::try_days(i64::from(self.config.overdue_lookback_days))
                    .ok_or(ServiceError::WindowOutOfRange)?,
            )
            .ok_or(ServiceError::WindowOutOfRange)?;
        let one_off_window =
            DateWindow::new(lookback_start, outer.end()).ok_or(ServiceError::WindowOutOfRange)?;

        let scope = PlanScope::feed(&query.owner_id);
        let snapshot = self
            .fetch_snapshot(&query.owner_id, scope, one_off_window, cancel)
            .await?;
        let plan = plan_upcoming(&snapshot.definitions, scope, &horizon);
        let filter = AggregateFilter {
            status: query.status,
            limit: Some(query.limit),
        };
        let items = aggregate(plan.occurrences, snapshot.one_offs, today, &filter);

        info!(
            "event=feed_materialize module=service status={} owner={} items={} considered={} expanded={} degraded={} duration_ms={}",
            status_label(&snapshot.degraded_tools),
            query.owner_id,
            items.len(),
            plan.stats.considered,
            plan.stats.expanded,
            snapshot.degraded_tools.len(),
            started_at.elapsed().as_millis()
        );

        Ok(Materialized {
            items,
            degraded_tools: snapshot.degraded_tools,
            stats: plan.stats,
        })
    }

    /// Every occurrence and one-off entry inside one calendar month.
    pub async fn calendar(
        &self,
        query: &CalendarQuery,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> ServiceResult<Materialized> {
        let started_at = Instant::now();
        let scope = PlanScope::calendar(&query.owner_id);
        let snapshot = self
            .fetch_snapshot(&query.owner_id, scope, query.window, cancel)
            .await?;
        let plan = plan_window(&snapshot.definitions, scope, query.window);
        let items = aggregate(
            plan.occurrences,
            snapshot.one_offs,
            today,
            &AggregateFilter::default(),
        );

        info!(
            "event=calendar_materialize module=service status={} owner={} month_start={} items={} considered={} expanded={} degraded={} duration_ms={}",
            status_label(&snapshot.degraded_tools),
            query.owner_id,
            query.window.start(),
            items.len(),
            plan.stats.considered,
            plan.stats.expanded,
            snapshot.degraded_tools.len(),
            started_at.elapsed().as_millis()
        );

        Ok(Materialized {
            items,
            degraded_tools: snapshot.degraded_tools,
            stats: plan.stats,
        })
    }

    /// Fan-out every tool read, fan-in once all have settled.
    async fn fetch_snapshot(
        &self,
        owner_id: &str,
        scope: PlanScope<'_>,
        one_off_window: DateWindow,
        cancel: &CancellationToken,
    ) -> ServiceResult<Snapshot> {
        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        let read_timeout = self.config.read_timeout;
        let definition_reads = join_all(self.definitions.iter().map(|repo| {
            let tool = repo.source_tool();
            let repo = Arc::clone(repo);
            let owner = owner_id.to_string();
            let include_inactive = scope.include_inactive;
            let handle = tokio::task::spawn_blocking(move || {
                if include_inactive {
                    repo.fetch_by_owner(&owner, tool)
                } else {
                    repo.fetch_active_by_owner(&owner, tool)
                }
            });
            settle(tool, "definitions", handle, read_timeout)
        }));
        let one_off_reads = join_all(self.one_offs.iter().map(|repo| {
            let tool = repo.source_tool();
            let repo = Arc::clone(repo);
            let owner = owner_id.to_string();
            let handle = tokio::task::spawn_blocking(move || {
                repo.fetch_by_owner_and_window(&owner, one_off_window)
            });
            settle(tool, "one_offs", handle, read_timeout)
        }));

        let (definitions, one_offs) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("event=snapshot_fetch module=service status=cancelled owner={owner_id}");
                return Err(ServiceError::Cancelled);
            }
            joined = futures::future::join(definition_reads, one_off_reads) => joined,
        };

        let mut degraded_tools = Vec::new();
        let mut snapshot_definitions = Vec::new();
        for contribution in definitions {
            if contribution.degraded {
                degraded_tools.push(contribution.tool);
            }
            snapshot_definitions.extend(contribution.rows);
        }
        let mut snapshot_one_offs = Vec::new();
        for contribution in one_offs {
            if contribution.degraded {
                degraded_tools.push(contribution.tool);
            }
            snapshot_one_offs.extend(contribution.rows.into_iter().filter(|entry| {
                entry.owner_id == owner_id && one_off_window.contains(entry.due_date)
            }));
        }
        degraded_tools.sort_unstable();
        degraded_tools.dedup();

        Ok(Snapshot {
            definitions: snapshot_definitions,
            one_offs: snapshot_one_offs,
            degraded_tools,
        })
    }
}

/// Waits for one tool read; any failure becomes an empty contribution.
async fn settle<T>(
    tool: SourceTool,
    kind: &'static str,
    handle: JoinHandle<RepoResult<Vec<T>>>,
    read_timeout: Duration,
) -> Contribution<T> {
    match tokio::time::timeout(read_timeout, handle).await {
        Ok(Ok(Ok(rows))) => {
            return Contribution {
                tool,
                rows,
                degraded: false,
            };
        }
        Ok(Ok(Err(err))) => warn!(
            "event=tool_read module=service status=degraded tool={tool} kind={kind} error_code=repo_error error={err}"
        ),
        Ok(Err(err)) => error!(
            "event=tool_read module=service status=degraded tool={tool} kind={kind} error_code=read_panicked error={err}"
        ),
        Err(_) => warn!(
            "event=tool_read module=service status=degraded tool={tool} kind={kind} error_code=read_timeout timeout_ms={}",
            read_timeout.as_millis()
        ),
    }

    Contribution {
        tool,
        rows: Vec::new(),
        degraded: true,
    }
}

fn status_label(degraded_tools: &[SourceTool]) -> &'static str {
    if degraded_tools.is_empty() {
        "ok"
    } else {
        "degraded"
    }
}
