use crate::error::SinkError;
use crate::table::{Cell, Grid};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Destination for a finished grid. Implementations must replace the previous contents in a
/// single atomic operation so a failed write leaves the old data in place.
pub trait SheetSink {
    fn replace_contents(&self, grid: &Grid) -> impl Future<Output = Result<(), SinkError>> + Send;
}

#[derive(Debug, Clone)]
pub enum Credentials {
    /// Pre-minted OAuth access token.
    AccessToken(String),
    /// Service account key file; a token is minted per write.
    ServiceAccount(PathBuf),
}

impl Credentials {
    async fn access_token(&self) -> Result<String, SinkError> {
        match self {
            Credentials::AccessToken(token) => Ok(token.clone()),
            Credentials::ServiceAccount(path) => service_account_token(path).await,
        }
    }
}

async fn service_account_token(path: &Path) -> Result<String, SinkError> {
    let key = yup_oauth2::read_service_account_key(path)
        .await
        .map_err(|err| {
            SinkError::Auth(format!(
                "failed to read service account key {}: {err}",
                path.display()
            ))
        })?;
    let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(|err| SinkError::Auth(format!("failed to build authenticator: {err}")))?;
    let token = auth
        .token(&[SHEETS_SCOPE])
        .await
        .map_err(|err| SinkError::Auth(err.to_string()))?;
    token
        .token()
        .map(str::to_string)
        .ok_or_else(|| SinkError::Auth("service account token response had no access token".into()))
}

pub struct GoogleSheetsSink {
    http: Client,
    base_url: Url,
    spreadsheet_id: String,
    sheet_id: Option<i64>,
    credentials: Credentials,
}

impl GoogleSheetsSink {
    pub fn new(
        http: Client,
        base_url: Url,
        spreadsheet_id: impl Into<String>,
        sheet_id: Option<i64>,
        credentials: Credentials,
    ) -> Self {
        Self {
            http,
            base_url,
            spreadsheet_id: spreadsheet_id.into(),
            sheet_id,
            credentials,
        }
    }

    fn spreadsheet_url(&self, suffix: &str) -> Result<Url, SinkError> {
        self.base_url
            .join(&format!("v4/spreadsheets/{}{suffix}", self.spreadsheet_id))
            .map_err(|err| SinkError::Decode(format!("invalid spreadsheet url: {err}")))
    }

    /// The first sheet of the spreadsheet is the one that gets replaced.
    async fn resolve_sheet_id(&self, token: &str) -> Result<i64, SinkError> {
        if let Some(sheet_id) = self.sheet_id {
            return Ok(sheet_id);
        }

        let response = self
            .http
            .get(self.spreadsheet_url("")?)
            .query(&[("fields", "sheets.properties.sheetId")])
            .bearer_auth(token)
            .send()
            .await?;
        let metadata: SpreadsheetMetadata = check_status(response).await?.json().await?;
        let sheet_id = first_sheet_id(&metadata)?;
        debug!(sheet_id, "resolved target sheet");
        Ok(sheet_id)
    }
}

impl SheetSink for GoogleSheetsSink {
    async fn replace_contents(&self, grid: &Grid) -> Result<(), SinkError> {
        let token = self.credentials.access_token().await?;
        let sheet_id = self.resolve_sheet_id(&token).await?;
        let body = batch_update_body(sheet_id, grid);

        let response = self
            .http
            .post(self.spreadsheet_url(":batchUpdate")?)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;

        info!(
            sheet_id,
            rows = grid.rows().len(),
            columns = grid.width(),
            "sheet contents replaced"
        );
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SinkError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    #[serde(default)]
    properties: Option<SheetProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: Option<i64>,
}

/// Sheets omits `sheetId` when it is 0, the id of a spreadsheet's original sheet.
fn first_sheet_id(metadata: &SpreadsheetMetadata) -> Result<i64, SinkError> {
    let first = metadata
        .sheets
        .first()
        .ok_or_else(|| SinkError::Decode("spreadsheet has no sheets".into()))?;
    Ok(first
        .properties
        .as_ref()
        .and_then(|props| props.sheet_id)
        .unwrap_or(0))
}

#[derive(Debug, Serialize)]
pub struct BatchUpdateRequest {
    requests: Vec<SheetRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum SheetRequest {
    DeleteRange(DeleteRange),
    AppendCells(AppendCells),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRange {
    range: GridRange,
    shift_dimension: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GridRange {
    sheet_id: i64,
    start_row_index: u32,
    start_column_index: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendCells {
    sheet_id: i64,
    rows: Vec<RowData>,
    fields: &'static str,
}

#[derive(Debug, Serialize)]
struct RowData {
    values: Vec<CellData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CellData {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_entered_value: Option<ExtendedValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum ExtendedValue {
    StringValue(String),
    NumberValue(f64),
}

impl From<&Cell> for CellData {
    fn from(cell: &Cell) -> Self {
        let user_entered_value = match cell {
            Cell::Text(text) => Some(ExtendedValue::StringValue(text.clone())),
            Cell::Number(value) => Some(ExtendedValue::NumberValue(*value)),
            Cell::Blank => None,
        };
        Self { user_entered_value }
    }
}

/// Clears every row of the sheet, then appends the grid, as one batch.
pub fn batch_update_body(sheet_id: i64, grid: &Grid) -> BatchUpdateRequest {
    let rows = grid
        .rows()
        .iter()
        .map(|row| RowData {
            values: row.iter().map(CellData::from).collect(),
        })
        .collect();

    BatchUpdateRequest {
        requests: vec![
            SheetRequest::DeleteRange(DeleteRange {
                range: GridRange {
                    sheet_id,
                    start_row_index: 0,
                    start_column_index: 0,
                },
                shift_dimension: "ROWS",
            }),
            SheetRequest::AppendCells(AppendCells {
                sheet_id,
                rows,
                fields: "userEnteredValue",
            }),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;
    use crate::zentra::{FetchResult, PortSeries, Reading};
    use serde_json::json;

    #[test]
    fn batch_update_clears_then_appends() {
        let mut series = PortSeries::new(1, "ECRN-100");
        series.readings.push(Reading {
            timestamp: 1700000300,
            value: 0.2,
        });
        let result: FetchResult = [series, PortSeries::new(2, "ATMOS 41")]
            .into_iter()
            .collect();
        let grid = TableBuilder::new().build(result);

        let body = serde_json::to_value(batch_update_body(42, &grid)).unwrap();

        assert_eq!(
            body,
            json!({
                "requests": [
                    {"deleteRange": {
                        "range": {"sheetId": 42, "startRowIndex": 0, "startColumnIndex": 0},
                        "shiftDimension": "ROWS"
                    }},
                    {"appendCells": {
                        "sheetId": 42,
                        "rows": [
                            {"values": [
                                {"userEnteredValue": {"stringValue": "Port 1: ECRN-100"}},
                                {"userEnteredValue": {"stringValue": "Port 1: ECRN-100"}},
                                {"userEnteredValue": {"stringValue": "Port 2: ATMOS 41"}},
                                {"userEnteredValue": {"stringValue": "Port 2: ATMOS 41"}}
                            ]},
                            {"values": [
                                {"userEnteredValue": {"numberValue": 1700000300.0}},
                                {"userEnteredValue": {"numberValue": 0.2}},
                                {},
                                {}
                            ]}
                        ],
                        "fields": "userEnteredValue"
                    }}
                ]
            })
        );
    }

    #[test]
    fn empty_grid_still_clears_the_sheet() {
        let grid = TableBuilder::new().build(FetchResult::new());
        let body = serde_json::to_value(batch_update_body(0, &grid)).unwrap();
        assert_eq!(body["requests"][0]["deleteRange"]["range"]["sheetId"], 0);
        assert_eq!(body["requests"][1]["appendCells"]["rows"], json!([{"values": []}]));
    }

    #[test]
    fn first_sheet_id_defaults_to_zero() {
        let metadata: SpreadsheetMetadata = serde_json::from_str(
            r#"{"sheets": [{"properties": {}}, {"properties": {"sheetId": 9}}]}"#,
        )
        .unwrap();
        assert_eq!(first_sheet_id(&metadata).unwrap(), 0);

        let metadata: SpreadsheetMetadata =
            serde_json::from_str(r#"{"sheets": [{"properties": {"sheetId": 1234}}]}"#).unwrap();
        assert_eq!(first_sheet_id(&metadata).unwrap(), 1234);

        let metadata: SpreadsheetMetadata = serde_json::from_str("{}").unwrap();
        assert!(matches!(first_sheet_id(&metadata), Err(SinkError::Decode(_))));
    }

    #[test]
    fn spreadsheet_urls_are_built_from_base() {
        let sink = GoogleSheetsSink::new(
            Client::new(),
            Url::parse("https://sheets.googleapis.com").unwrap(),
            "abc123",
            Some(0),
            Credentials::AccessToken("token".into()),
        );
        assert_eq!(
            sink.spreadsheet_url(":batchUpdate").unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123:batchUpdate"
        );
        assert_eq!(
            sink.spreadsheet_url("").unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123"
        );
    }
}
