use crate::zentra::FetcherConfig;
use anyhow::{anyhow, bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

const DEFAULT_ZENTRA_BASE_URL: &str = "https://zentracloud.com";
const DEFAULT_DEVICE_SN: &str = "z6-07496";
const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
const DEFAULT_SPREADSHEET_ID: &str = "1e_qMx2egdqsUFI_46u0JW1daivNzeVteudA5BwY-8oM";

#[derive(Debug, Clone)]
pub struct Config {
    pub zentra_base_url: Url,
    pub device_sn: String,
    pub per_page: u32,
    pub rate_limit_window: Duration,
    /// `None` keeps retrying 423/429 forever.
    pub max_lockout_retries: Option<u32>,
    pub request_timeout: Duration,
    pub request_interval_days: i64,

    pub sheets_base_url: Url,
    pub spreadsheet_id: String,
    pub sheet_id: Option<i64>,
    pub google_access_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars { lookup: &lookup };

        let zentra_base_url = vars.url("ZENTRA_BASE_URL", DEFAULT_ZENTRA_BASE_URL)?;
        let device_sn = vars.string("ZENTRA_DEVICE_SN", DEFAULT_DEVICE_SN);
        let per_page = vars.u64("ZENTRA_PER_PAGE", 1000)?;
        if per_page == 0 || per_page > u32::MAX as u64 {
            bail!("ZENTRA_PER_PAGE must be between 1 and {}", u32::MAX);
        }
        let rate_limit_window = Duration::from_secs(vars.u64("ZENTRA_RATE_LIMIT_SECONDS", 60)?);
        let max_lockout_retries = match vars.u64("ZENTRA_MAX_LOCKOUT_RETRIES", 30)? {
            0 => None,
            n => Some(u32::try_from(n).context("ZENTRA_MAX_LOCKOUT_RETRIES is too large")?),
        };
        let request_timeout =
            Duration::from_secs(vars.u64("ZENTRA_REQUEST_TIMEOUT_SECONDS", 60)?.max(1));
        let request_interval_days = i64::try_from(vars.u64("FOG_REQUEST_INTERVAL_DAYS", 7)?)
            .context("FOG_REQUEST_INTERVAL_DAYS is too large")?;

        let sheets_base_url = vars.url("SHEETS_BASE_URL", DEFAULT_SHEETS_BASE_URL)?;
        let spreadsheet_id = vars.string("SPREADSHEET_ID", DEFAULT_SPREADSHEET_ID);
        let sheet_id = match vars.optional("SHEET_ID") {
            Some(raw) => Some(raw.parse::<i64>().context("invalid SHEET_ID")?),
            None => None,
        };
        let google_access_token = vars.optional("GOOGLE_ACCESS_TOKEN");

        Ok(Self {
            zentra_base_url,
            device_sn,
            per_page: per_page as u32,
            rate_limit_window,
            max_lockout_retries,
            request_timeout,
            request_interval_days,
            sheets_base_url,
            spreadsheet_id,
            sheet_id,
            google_access_token,
        })
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            device_sn: self.device_sn.clone(),
            per_page: self.per_page,
            rate_limit_window: self.rate_limit_window,
            max_lockout_retries: self.max_lockout_retries,
        }
    }
}

/// Reads the ZENTRA API token. The file holds the bare token, without the `Token ` prefix.
pub fn read_token_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ZENTRA token file {}", path.display()))?;
    let token = raw.trim();
    if token.is_empty() {
        bail!("ZENTRA token file {} is empty", path.display());
    }
    Ok(token.to_string())
}

struct Vars<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Vars<'_> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn u64(&self, key: &str, default: u64) -> Result<u64> {
        match self.optional(key) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|err| anyhow!("invalid {key} ({raw}): {err}")),
            None => Ok(default),
        }
    }

    fn url(&self, key: &str, default: &str) -> Result<Url> {
        let raw = self.string(key, default);
        Url::parse(&raw).with_context(|| format!("invalid {key}"))
    }
}
