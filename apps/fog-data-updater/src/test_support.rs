use crate::zentra::{FetcherConfig, RawResponse, ReadingsApi, ReadingsQuery};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::{Duration, Instant};

/// A 200 body without a `Precipitation` section.
pub const TERMINAL_BODY: &str = r#"{"data": {}}"#;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub token: String,
    pub page_num: u32,
    pub per_page: u32,
    pub at: Instant,
}

/// Replays canned responses in order; once exhausted it keeps answering with the terminal
/// empty-data payload.
pub struct ScriptedApi {
    responses: Mutex<VecDeque<RawResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedApi {
    pub fn new(responses: impl IntoIterator<Item = RawResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn page_nums(&self) -> Vec<u32> {
        self.requests().iter().map(|req| req.page_num).collect()
    }
}

impl ReadingsApi for ScriptedApi {
    async fn get_readings(
        &self,
        token: &str,
        query: &ReadingsQuery<'_>,
    ) -> Result<RawResponse, reqwest::Error> {
        self.requests.lock().unwrap().push(RecordedRequest {
            token: token.to_string(),
            page_num: query.page_num,
            per_page: query.per_page,
            at: Instant::now(),
        });
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| ok(TERMINAL_BODY)))
    }
}

pub fn ok(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        body: body.to_string(),
    }
}

pub fn status(code: u16) -> RawResponse {
    RawResponse {
        status: code,
        body: format!("{{\"detail\": \"status {code}\"}}"),
    }
}

/// Builds a 200 precipitation page from `(port_number, sensor_name, readings)` triples.
pub fn page(ports: Vec<(u32, &str, Vec<(i64, f64)>)>) -> RawResponse {
    let entries: Vec<_> = ports
        .iter()
        .map(|(port_number, sensor_name, readings)| {
            json!({
                "metadata": {"port_number": port_number, "sensor_name": sensor_name},
                "readings": readings
                    .iter()
                    .map(|(ts, value)| json!({"timestamp_utc": ts, "value": value}))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    ok(&json!({"data": {"Precipitation": entries}}).to_string())
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

pub fn fetcher_config() -> FetcherConfig {
    FetcherConfig {
        device_sn: "z6-07496".to_string(),
        per_page: 1000,
        rate_limit_window: Duration::from_secs(60),
        max_lockout_retries: Some(5),
    }
}
