use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeDelta, Utc};
use clap::Parser;
use std::path::PathBuf;

use crate::pipeline::Window;

#[derive(Debug, Parser)]
#[command(
    name = "fog-data-updater",
    version,
    about = "Republish ZENTRA precipitation readings into a Google Sheet"
)]
pub struct Cli {
    /// JSON credentials file for the service account used to access Google Sheets.
    pub service_account_file: PathBuf,
    /// File containing the ZENTRA API token. It should NOT include the `Token ` prefix.
    pub zentra_token_file: PathBuf,
    /// Length of the window ending at `--end` (defaults to FOG_REQUEST_INTERVAL_DAYS).
    #[arg(long)]
    pub days: Option<i64>,
    /// Window start, RFC 3339. Overrides `--days`.
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,
    /// Window end, RFC 3339. Defaults to now.
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,
    /// Fetch and build the table but do not touch the sheet.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

impl Cli {
    pub fn window(&self, now: DateTime<Utc>, default_days: i64) -> Result<Window> {
        let end = self.end.unwrap_or(now);
        let start = match self.start {
            Some(start) => start,
            None => {
                let days = self.days.unwrap_or(default_days);
                TimeDelta::try_days(days)
                    .and_then(|span| end.checked_sub_signed(span))
                    .ok_or_else(|| anyhow!("window of {days} days before {end} is out of range"))?
            }
        };
        Ok(Window { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_window_ends_now() {
        let cli = Cli::parse_from(["fog-data-updater", "sa.json", "token.txt"]);
        let now = Utc.with_ymd_and_hms(2024, 6, 8, 12, 0, 0).unwrap();

        let window = cli.window(now, 7).unwrap();

        assert_eq!(window.end, now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        assert!(!cli.dry_run);
        assert_eq!(cli.service_account_file, PathBuf::from("sa.json"));
    }

    #[test]
    fn explicit_bounds_win() {
        let cli = Cli::parse_from([
            "fog-data-updater",
            "sa.json",
            "token.txt",
            "--days",
            "30",
            "--start",
            "2024-05-01T00:00:00Z",
            "--end",
            "2024-05-03T00:00:00Z",
            "--dry-run",
        ]);
        let now = Utc.with_ymd_and_hms(2024, 6, 8, 12, 0, 0).unwrap();

        let window = cli.window(now, 7).unwrap();

        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap());
        assert!(cli.dry_run);
    }

    #[test]
    fn days_counts_back_from_end() {
        let cli = Cli::parse_from([
            "fog-data-updater",
            "sa.json",
            "token.txt",
            "--days",
            "2",
            "--end",
            "2024-05-03T00:00:00Z",
        ]);
        let window = cli.window(Utc::now(), 7).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn out_of_range_days_are_an_error() {
        let cli = Cli::parse_from([
            "fog-data-updater",
            "sa.json",
            "token.txt",
            "--days",
            "9223372036854775807",
        ]);
        assert!(cli.window(Utc::now(), 7).is_err());

        let cli = Cli::parse_from(["fog-data-updater", "sa.json", "token.txt"]);
        assert!(cli.window(Utc::now(), 200_000_000).is_err());
    }
}
