//! HTTP transport over the materialization API.
//!
//! # Responsibility
//! - Route `/schedule/feed`, `/schedule/calendar` and `/health`.
//! - Bound every request by a deadline that cancels in-flight reads.
//!
//! # Invariants
//! - Errors always answer with an `ErrorBody` JSON payload.
//! - A request dropped by the client cancels its reads.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use hearth_core::{
    get_calendar, get_feed, ApiError, CalendarParams, CalendarResponse, FeedParams, FeedResponse,
    MaterializationService,
};
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct AppState {
    pub service: MaterializationService,
    pub request_timeout: Duration,
    /// Fixed "today" for reproducible runs; local date when `None`.
    pub today: Option<NaiveDate>,
}

impl AppState {
    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

pub type SharedState = Arc<AppState>;

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schedule/feed", get(feed))
        .route("/schedule/calendar", get(calendar))
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: SharedState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "event=server_start module=cli status=ok bind={} request_timeout_ms={}",
        listener.local_addr()?,
        state.request_timeout.as_millis()
    );

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("event=server_stop module=cli status=ok");
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn feed(
    State(state): State<SharedState>,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedResponse>, HttpError> {
    let deadline = RequestDeadline::start(state.request_timeout);
    let response = get_feed(&state.service, &params, state.today(), deadline.token()).await?;
    Ok(Json(response))
}

async fn calendar(
    State(state): State<SharedState>,
    Query(params): Query<CalendarParams>,
) -> Result<Json<CalendarResponse>, HttpError> {
    let deadline = RequestDeadline::start(state.request_timeout);
    let response = get_calendar(&state.service, &params, state.today(), deadline.token()).await?;
    Ok(Json(response))
}

/// Per-request cancellation scope.
///
/// The token fires when the timeout elapses or when the scope is dropped,
/// which also covers clients that disconnect mid-request.
struct RequestDeadline {
    cancel: CancellationToken,
    timer: JoinHandle<()>,
}

impl RequestDeadline {
    fn start(timeout: Duration) -> Self {
        let cancel = CancellationToken::new();
        let expired = cancel.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            expired.cancel();
        });
        Self { cancel, timer }
    }

    fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Drop for RequestDeadline {
    fn drop(&mut self) {
        self.timer.abort();
        self.cancel.cancel();
    }
}

pub struct HttpError(ApiError);

impl From<ApiError> for HttpError {
    fn from(value: ApiError) -> Self {
        Self(value)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        warn!(
            "event=http_request module=cli status=error http_status={} error_code={} error={}",
            status.as_u16(),
            self.0.code(),
            self.0
        );
        (status, Json(self.0.body())).into_response()
    }
}
