use crate::error::{FetchError, PipelineError};
use crate::sheets::SheetSink;
use crate::table::{Grid, TableBuilder};
use crate::zentra::{ReadingsApi, SensorFetcher};
use chrono::{DateTime, Utc};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Fetches the whole window and turns it into a grid. Nothing is returned unless the fetch
/// completed.
pub async fn fetch_grid<A: ReadingsApi>(
    fetcher: &SensorFetcher<A>,
    token: &str,
    window: Window,
) -> Result<Grid, FetchError> {
    info!(start = %window.start, end = %window.end, "querying ZENTRA");
    let result = fetcher.fetch(token, window.start, window.end).await?;
    info!(
        ports = result.len(),
        readings = result.reading_count(),
        "ZENTRA query complete"
    );
    Ok(TableBuilder::new().build(result))
}

/// Fetch, build, then replace the sheet contents. The sink is only touched after a complete
/// fetch.
pub async fn run<A: ReadingsApi, S: SheetSink>(
    fetcher: &SensorFetcher<A>,
    sink: &S,
    token: &str,
    window: Window,
) -> Result<Grid, PipelineError> {
    let grid = fetch_grid(fetcher, token, window).await?;
    sink.replace_contents(&grid).await?;
    Ok(grid)
}
