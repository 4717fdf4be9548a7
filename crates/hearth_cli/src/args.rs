//! Command-line and environment configuration.
//!
//! # Responsibility
//! - Parse flags with `HEARTH_*` environment fallbacks.
//! - Translate tunables into a core `MaterializeConfig`.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hearth_core::MaterializeConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const MAX_LOOKAHEAD_CYCLES: i64 = 120;
/// Ten years.
const MAX_HORIZON_DAYS: i64 = 3660;

#[derive(Debug, Parser)]
#[command(name = "hearth", version, about = "Household schedule materialization")]
pub struct Cli {
    /// SQLite database holding every tool's tables.
    #[arg(long, env = "HEARTH_DB_PATH", default_value = "hearth.db", global = true)]
    pub db: PathBuf,

    /// Absolute directory for rolling log files; stderr when unset.
    #[arg(long, env = "HEARTH_LOG_DIR", global = true)]
    pub log_dir: Option<String>,

    /// trace|debug|info|warn|error (defaults by build mode).
    #[arg(long, env = "HEARTH_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Budget for a single tool read.
    #[arg(long, env = "HEARTH_READ_TIMEOUT_MS", default_value_t = 2000, global = true)]
    pub read_timeout_ms: u64,

    /// Cycles each definition looks ahead in the feed.
    #[arg(
        long,
        env = "HEARTH_LOOKAHEAD_CYCLES",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..=MAX_LOOKAHEAD_CYCLES),
        global = true
    )]
    pub lookahead_cycles: u32,

    #[arg(
        long,
        env = "HEARTH_MAX_HORIZON_DAYS",
        default_value_t = 366,
        value_parser = clap::value_parser!(u32).range(1..=MAX_HORIZON_DAYS),
        global = true
    )]
    pub max_horizon_days: u32,

    #[arg(
        long,
        env = "HEARTH_OVERDUE_LOOKBACK_DAYS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u32).range(0..=MAX_HORIZON_DAYS),
        global = true
    )]
    pub overdue_lookback_days: u32,

    /// Pin "today" (YYYY-MM-DD) instead of the local date.
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify core linkage.
    Ping,
    /// Print the upcoming action feed as JSON.
    Feed {
        #[arg(long)]
        owner: String,
        /// pending|completed|skipped
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print one month of the calendar as JSON.
    Calendar {
        #[arg(long)]
        owner: String,
        /// YYYY-MM
        #[arg(long)]
        month: String,
    },
    /// Serve the HTTP API.
    Serve {
        #[arg(long, env = "HEARTH_BIND", default_value = "127.0.0.1:8787")]
        bind: SocketAddr,
        /// Whole-request deadline; requests past it answer 504.
        #[arg(long, env = "HEARTH_REQUEST_TIMEOUT_MS", default_value_t = 5000)]
        request_timeout_ms: u64,
    },
}

impl Cli {
    pub fn materialize_config(&self) -> MaterializeConfig {
        MaterializeConfig {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            lookahead_cycles: self.lookahead_cycles,
            max_horizon_days: self.max_horizon_days,
            overdue_lookback_days: self.overdue_lookback_days,
            ..MaterializeConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};
    use std::time::Duration;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn feed_flags_parse_into_config() {
        let cli = Cli::try_parse_from([
            "hearth",
            "--read-timeout-ms",
            "250",
            "--lookahead-cycles",
            "3",
            "feed",
            "--owner",
            "house-1",
            "--limit",
            "5",
        ])
        .unwrap();

        let config = cli.materialize_config();
        assert_eq!(config.read_timeout, Duration::from_millis(250));
        assert_eq!(config.lookahead_cycles, 3);
        match cli.command {
            Command::Feed { owner, limit, .. } => {
                assert_eq!(owner, "house-1");
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn zero_lookahead_is_rejected() {
        let result = Cli::try_parse_from(["hearth", "--lookahead-cycles", "0", "ping"]);
        assert!(result.is_err());
    }

    #[test]
    fn oversized_horizons_are_rejected() {
        for (flag, value) in [
            ("--lookahead-cycles", "4294967295"),
            ("--lookahead-cycles", "121"),
            ("--max-horizon-days", "3661"),
            ("--overdue-lookback-days", "100000"),
        ] {
            let result = Cli::try_parse_from(["hearth", flag, value, "ping"]);
            assert!(result.is_err(), "{flag}={value} should be rejected");
        }

        let cli = Cli::try_parse_from([
            "hearth",
            "--lookahead-cycles",
            "120",
            "--max-horizon-days",
            "3660",
            "ping",
        ])
        .unwrap();
        assert_eq!(cli.materialize_config().max_horizon_days, 3660);
    }

    #[test]
    fn today_override_parses_iso_dates() {
        let cli = Cli::try_parse_from([
            "hearth",
            "calendar",
            "--owner",
            "house-1",
            "--month",
            "2025-03",
            "--today",
            "2025-03-10",
        ])
        .unwrap();
        assert_eq!(cli.today, chrono::NaiveDate::from_ymd_opt(2025, 3, 10));
    }
}
