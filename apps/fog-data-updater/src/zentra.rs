//! ZENTRA Cloud readings: wire client, paginated fetcher, and the per-port data model.

mod api;
mod fetcher;
mod model;


pub use api::{
    RawResponse, ReadingsApi, ReadingsQuery, ZentraClient, STATUS_LOCKED, STATUS_OK,
    STATUS_RATE_LIMITED,
};
pub use fetcher::{progress_percent, FetcherConfig, SensorFetcher};
pub use model::{FetchResult, PortSeries, Reading};
