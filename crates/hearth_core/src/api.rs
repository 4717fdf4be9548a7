//! Materialization API surface shared by the CLI and HTTP transports.
//!
//! # Responsibility
//! - Validate raw query parameters before they reach the engine.
//! - Shape feed/calendar responses and error bodies.
//!
//! # Invariants
//! - Malformed input is rejected here with `ApiError::Validation`; the
//!   expander never sees it.
//! - Responses carry `degradedTools` so callers can tell partial data apart.

use crate::model::schedule::{ItemStatus, SourceTool};
use crate::schedule::aggregator::ActionItem;
use crate::schedule::window::DateWindow;
use crate::service::materialize::{
    CalendarQuery, FeedQuery, MaterializationService, MaterializeConfig, ServiceError,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio_util::sync::CancellationToken;

static OWNER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:\-]{0,63}$").expect("valid owner id regex"));
static MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("valid month regex"));

/// Raw `GET /schedule/feed` parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedParams {
    pub owner_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<String>,
}

/// Raw `GET /schedule/calendar` parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarParams {
    pub owner_id: Option<String>,
    pub month: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Validation {
        field: &'static str,
        message: String,
    },
    Cancelled,
    Internal(String),
}

impl ApiError {
    fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "invalid_request",
            Self::Cancelled => "request_cancelled",
            Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status the transport should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Cancelled => 504,
            Self::Internal(_) => 500,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code(),
            message: self.to_string(),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { field, message } => write!(f, "invalid `{field}`: {message}"),
            Self::Cancelled => write!(f, "request cancelled or timed out"),
            Self::Internal(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ApiError {}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Cancelled => Self::Cancelled,
            ServiceError::WindowOutOfRange => Self::Internal(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub owner_id: String,
    pub today: NaiveDate,
    pub items: Vec<ActionItem>,
    pub degraded_tools: Vec<SourceTool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub owner_id: String,
    /// `YYYY-MM`.
    pub month: String,
    pub items: Vec<ActionItem>,
    pub degraded_tools: Vec<SourceTool>,
}

impl FeedParams {
    /// Validates parameters against the service limits.
    ///
    /// - `limit` defaults to `config.default_feed_limit` and is capped at
    ///   `config.max_feed_limit`; zero or non-numeric values are rejected.
    /// - Missing `status` means every status.
    pub fn validate(&self, config: &MaterializeConfig) -> Result<FeedQuery, ApiError> {
        let owner_id = validate_owner_id(self.owner_id.as_deref())?;

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(ItemStatus::parse(&value.to_ascii_lowercase()).ok_or_else(
                || {
                    ApiError::validation(
                        "status",
                        format!("unsupported status `{value}`; expected pending|completed|skipped"),
                    )
                },
            )?),
        };

        let limit = match self.limit.as_deref().map(str::trim) {
            None | Some("") => config.default_feed_limit,
            Some(value) => match value.parse::<usize>() {
                Ok(0) => return Err(ApiError::validation("limit", "must be at least 1")),
                Ok(limit) => limit.min(config.max_feed_limit),
                Err(_) => {
                    return Err(ApiError::validation(
                        "limit",
                        format!("`{value}` is not a positive integer"),
                    ))
                }
            },
        };

        Ok(FeedQuery {
            owner_id,
            status,
            limit,
        })
    }
}

impl CalendarParams {
    pub fn validate(&self) -> Result<CalendarQuery, ApiError> {
        let owner_id = validate_owner_id(self.owner_id.as_deref())?;
        let month = self
            .month
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::validation("month", "is required (YYYY-MM)"))?;
        let window = parse_month(month)?;
        Ok(CalendarQuery { owner_id, window })
    }
}

/// Parses `YYYY-MM` into its month window.
pub fn parse_month(value: &str) -> Result<DateWindow, ApiError> {
    let malformed = || ApiError::validation("month", format!("`{value}` is not YYYY-MM"));
    let captures = MONTH_RE.captures(value).ok_or_else(malformed)?;
    let year = captures[1].parse::<i32>().map_err(|_| malformed())?;
    let month = captures[2].parse::<u32>().map_err(|_| malformed())?;
    DateWindow::month(year, month).ok_or_else(malformed)
}

fn validate_owner_id(value: Option<&str>) -> Result<String, ApiError> {
    let value = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::validation("ownerId", "is required"))?;
    if !OWNER_ID_RE.is_match(value) {
        return Err(ApiError::validation(
            "ownerId",
            format!("`{value}` contains unsupported characters"),
        ));
    }
    Ok(value.to_string())
}

/// `GET /schedule/feed`.
pub async fn get_feed(
    service: &MaterializationService,
    params: &FeedParams,
    today: NaiveDate,
    cancel: &CancellationToken,
) -> Result<FeedResponse, ApiError> {
    let query = params.validate(service.config())?;
    let materialized = service.feed(&query, today, cancel).await?;
    Ok(FeedResponse {
        owner_id: query.owner_id,
        today,
        items: materialized.items,
        degraded_tools: materialized.degraded_tools,
    })
}

/// `GET /schedule/calendar`.
pub async fn get_calendar(
    service: &MaterializationService,
    params: &CalendarParams,
    today: NaiveDate,
    cancel: &CancellationToken,
) -> Result<CalendarResponse, ApiError> {
    let query = params.validate()?;
    let materialized = service.calendar(&query, today, cancel).await?;
    Ok(CalendarResponse {
        owner_id: query.owner_id,
        month: query.window.start().format("%Y-%m").to_string(),
        items: materialized.items,
        degraded_tools: materialized.degraded_tools,
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_month, ApiError, CalendarParams, FeedParams};
    use crate::model::schedule::ItemStatus;
    use crate::service::materialize::MaterializeConfig;
    use chrono::NaiveDate;

    fn feed_params(owner: &str, status: Option<&str>, limit: Option<&str>) -> FeedParams {
        FeedParams {
            owner_id: Some(owner.to_string()),
            status: status.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn feed_params_apply_defaults_and_caps() {
        let config = MaterializeConfig::default();

        let query = feed_params("house-1", None, None).validate(&config).unwrap();
        assert_eq!(query.limit, config.default_feed_limit);
        assert_eq!(query.status, None);

        let query = feed_params("house-1", Some("Pending"), Some("100000"))
            .validate(&config)
            .unwrap();
        assert_eq!(query.limit, config.max_feed_limit);
        assert_eq!(query.status, Some(ItemStatus::Pending));
    }

    #[test]
    fn feed_params_reject_bad_values() {
        let config = MaterializeConfig::default();

        let err = feed_params("house-1", Some("done-ish"), None)
            .validate(&config)
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "status", .. }));

        let err = feed_params("house-1", None, Some("0"))
            .validate(&config)
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "limit", .. }));

        let err = feed_params("house 1; drop", None, None)
            .validate(&config)
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "ownerId", .. }));
        assert_eq!(err.http_status(), 400);

        let err = FeedParams::default().validate(&config).unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "ownerId", .. }));
    }

    #[test]
    fn month_parsing_is_strict() {
        let window = parse_month("2024-02").unwrap();
        assert_eq!(window.start(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(window.end(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        for bad in ["2024-13", "2024-00", "2024-2", "24-02", "2024/02", "2024-02-01"] {
            assert!(parse_month(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn calendar_params_require_month() {
        let params = CalendarParams {
            owner_id: Some("house-1".to_string()),
            month: None,
        };
        let err = params.validate().unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }
}
