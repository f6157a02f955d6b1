use super::api::{
    parse_page, PortPayload, ReadingsApi, ReadingsQuery, STATUS_LOCKED, STATUS_OK,
    STATUS_RATE_LIMITED,
};
use super::model::{FetchResult, Reading};
use crate::error::FetchError;
use chrono::{DateTime, Utc};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub device_sn: String,
    pub per_page: u32,
    /// ZENTRA allows one request per device per window.
    pub rate_limit_window: Duration,
    /// Consecutive 423/429 answers tolerated for a single page. `None` retries forever.
    pub max_lockout_retries: Option<u32>,
}

pub struct SensorFetcher<A> {
    api: A,
    config: FetcherConfig,
}

impl<A: ReadingsApi> SensorFetcher<A> {
    pub fn new(api: A, config: FetcherConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Pages backwards from `end` until every port has reported a reading at or before
    /// `start`. The last page may overshoot `start`; nothing is trimmed.
    pub async fn fetch(
        &self,
        token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FetchResult, FetchError> {
        if end < start {
            return Err(FetchError::InvalidRange { start, end });
        }

        let start_time = start.timestamp();
        let end_time = end.timestamp();

        let mut result = FetchResult::new();
        let mut earliest_seen = end_time;
        let mut page_num = 1u32;
        let mut lockouts = 0u32;
        let mut last_request: Option<Instant> = None;

        while earliest_seen > start_time {
            if let Some(started) = last_request {
                let wait = self
                    .config
                    .rate_limit_window
                    .saturating_sub(started.elapsed());
                if !wait.is_zero() {
                    debug!(wait_ms = wait.as_millis() as u64, "waiting out ZENTRA rate limit");
                    sleep(wait).await;
                }
            }

            let query = ReadingsQuery {
                device_sn: &self.config.device_sn,
                start,
                end,
                page_num,
                per_page: self.config.per_page,
            };
            last_request = Some(Instant::now());
            let response = self.api.get_readings(token, &query).await?;

            match response.status {
                STATUS_OK => {
                    let Some(ports) = parse_page(&response.body)? else {
                        // The gap between `earliest_seen` and `start` is shorter than the
                        // sampling interval.
                        debug!(page_num, "ZENTRA returned no precipitation data; done");
                        break;
                    };

                    if append_page(&mut result, ports, page_num)? == 0 {
                        debug!(page_num, "ZENTRA page carried no readings; done");
                        break;
                    }

                    if let Some(oldest) = result.earliest_last_reading() {
                        earliest_seen = oldest;
                    }
                    page_num += 1;
                    lockouts = 0;

                    info!(
                        progress = progress_percent(start_time, end_time, earliest_seen),
                        pages = page_num - 1,
                        "ZENTRA data processed"
                    );
                }
                STATUS_LOCKED | STATUS_RATE_LIMITED => {
                    lockouts += 1;
                    if let Some(max) = self.config.max_lockout_retries {
                        if lockouts > max {
                            return Err(FetchError::LockoutRetriesExhausted {
                                attempts: lockouts,
                                status: response.status,
                            });
                        }
                    }
                    info!(
                        status = response.status,
                        attempt = lockouts,
                        "ZENTRA lockout received, waiting to retry"
                    );
                }
                status => {
                    return Err(FetchError::Upstream {
                        status,
                        body: response.body,
                    });
                }
            }
        }

        Ok(result)
    }
}

/// Appends every reading of the page in received order and returns how many were appended.
///
/// Each port must continue strictly older than its own last reading. Ports that ran out of data
/// on an earlier page are simply absent, so the check is per port rather than per page.
fn append_page(
    result: &mut FetchResult,
    ports: Vec<PortPayload>,
    page_num: u32,
) -> Result<usize, FetchError> {
    let mut appended = 0;
    for port in ports {
        let series = result.series_mut(port.metadata.port_number, &port.metadata.sensor_name);
        if let (Some(previous), Some(first)) = (series.oldest_timestamp(), port.readings.first()) {
            if first.timestamp_utc >= previous {
                return Err(FetchError::MalformedResponse(format!(
                    "page {page_num} port {} reading {} is not older than its previous reading {previous}",
                    port.metadata.port_number, first.timestamp_utc
                )));
            }
        }
        appended += port.readings.len();
        series
            .readings
            .extend(port.readings.into_iter().map(|reading| Reading {
                timestamp: reading.timestamp_utc,
                value: reading.value,
            }));
    }
    Ok(appended)
}

pub fn progress_percent(start_time: i64, end_time: i64, earliest_seen: i64) -> u8 {
    let span = end_time - start_time;
    if span <= 0 {
        return 100;
    }
    let done = (end_time - earliest_seen).clamp(0, span);
    (done * 100 / span) as u8
}
