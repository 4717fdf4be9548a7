//! `hearth` command-line entry point.
//!
//! # Responsibility
//! - Initialize logging, then dispatch to one-shot queries or the HTTP server.
//! - Print query results as pretty JSON on stdout.

mod args;
mod server;

use args::{Cli, Command};
use clap::Parser;
use hearth_core::db::{open_db, DbError};
use hearth_core::{
    default_log_level, get_calendar, get_feed, init_logging, ApiError, CalendarParams,
    FeedParams, MaterializationService,
};
use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
enum CliError {
    Logging(String),
    Db(DbError),
    Api(ApiError),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Api(err) => write!(f, "{}: {err}", err.code()),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "serialization error: {err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Api(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Logging(_) => None,
        }
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ApiError> for CliError {
    fn from(value: ApiError) -> Self {
        Self::Api(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, cli.log_dir.as_deref()).map_err(CliError::Logging)?;

    let config = cli.materialize_config();
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    match cli.command {
        Command::Ping => {
            println!("hearth_core ping={}", hearth_core::ping());
            println!("hearth_core version={}", hearth_core::core_version());
            Ok(())
        }
        Command::Feed {
            owner,
            status,
            limit,
        } => {
            let service = MaterializationService::sqlite(&cli.db, config);
            let params = FeedParams {
                owner_id: Some(owner),
                status,
                limit: limit.map(|limit| limit.to_string()),
            };
            let cancel = cancel_on_ctrl_c();
            let response = get_feed(&service, &params, today, &cancel).await?;
            print_json(&response)
        }
        Command::Calendar { owner, month } => {
            let service = MaterializationService::sqlite(&cli.db, config);
            let params = CalendarParams {
                owner_id: Some(owner),
                month: Some(month),
            };
            let cancel = cancel_on_ctrl_c();
            let response = get_calendar(&service, &params, today, &cancel).await?;
            print_json(&response)
        }
        Command::Serve {
            bind,
            request_timeout_ms,
        } => {
            // Reads are read-only; make sure the schema exists before serving.
            drop(open_db(&cli.db)?);
            info!(
                "event=db_ready module=cli status=ok path={}",
                cli.db.display()
            );

            let state = server::AppState {
                service: MaterializationService::sqlite(&cli.db, config),
                request_timeout: Duration::from_millis(request_timeout_ms),
                today: cli.today,
            };
            server::serve(bind, Arc::new(state)).await?;
            Ok(())
        }
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let interrupted = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted.cancel();
        }
    });
    cancel
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
