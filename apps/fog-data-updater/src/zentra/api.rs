use crate::error::FetchError;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use url::Url;

const READINGS_PATH: &str = "api/v3/get_readings/";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const STATUS_OK: u16 = 200;
pub const STATUS_LOCKED: u16 = 423;
pub const STATUS_RATE_LIMITED: u16 = 429;

#[derive(Debug, Clone)]
pub struct ReadingsQuery<'a> {
    pub device_sn: &'a str,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub page_num: u32,
    pub per_page: u32,
}

impl ReadingsQuery<'_> {
    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("device_sn", self.device_sn.to_string()),
            ("start_date", self.start.format(DATE_FORMAT).to_string()),
            ("end_date", self.end.format(DATE_FORMAT).to_string()),
            ("page_num", self.page_num.to_string()),
            ("per_page", self.per_page.to_string()),
        ]
    }
}

/// Status and body of one `get_readings` call. Status interpretation is left to the fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

pub trait ReadingsApi {
    fn get_readings(
        &self,
        token: &str,
        query: &ReadingsQuery<'_>,
    ) -> impl Future<Output = Result<RawResponse, reqwest::Error>> + Send;
}

pub struct ZentraClient {
    http: Client,
    endpoint: Url,
}

impl ZentraClient {
    pub fn new(http: Client, base_url: &Url) -> Result<Self, url::ParseError> {
        let endpoint = base_url.join(READINGS_PATH)?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl ReadingsApi for ZentraClient {
    async fn get_readings(
        &self,
        token: &str,
        query: &ReadingsQuery<'_>,
    ) -> Result<RawResponse, reqwest::Error> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&query.params())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Token {token}"))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct ReadingsEnvelope {
    #[serde(default)]
    data: Option<ReadingsData>,
}

#[derive(Debug, Deserialize)]
struct ReadingsData {
    #[serde(rename = "Precipitation", default)]
    precipitation: Option<Vec<PortPayload>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PortPayload {
    pub(crate) metadata: PortMetadata,
    pub(crate) readings: Vec<ReadingPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PortMetadata {
    pub(crate) port_number: u32,
    pub(crate) sensor_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReadingPayload {
    pub(crate) timestamp_utc: i64,
    pub(crate) value: f64,
}

/// Decodes a 200 body. `Ok(None)` is the "nothing left in the window" shape: no `data`
/// section, or no `Precipitation` inside it. Everything else that fails to decode is an error.
pub(crate) fn parse_page(body: &str) -> Result<Option<Vec<PortPayload>>, FetchError> {
    let envelope: ReadingsEnvelope = serde_json::from_str(body)
        .map_err(|err| FetchError::MalformedResponse(err.to_string()))?;
    Ok(envelope.data.and_then(|data| data.precipitation))
}
