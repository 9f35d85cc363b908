use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::errors::{InvoiceParserError, InvoiceParserResult};
use crate::sheets::auth::ServiceAccountAuth;
use crate::sheets::layout::{CellValue, Row};
use crate::sheets::store::SheetStore;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Row],
}

/// Google Sheets v4 `spreadsheets.values` client for one spreadsheet.
pub struct GoogleSheetsStore {
    spreadsheet_id: String,
    api_base: String,
    auth: ServiceAccountAuth,
    client: reqwest::Client,
}

impl GoogleSheetsStore {
    pub fn new(spreadsheet_id: String, auth: ServiceAccountAuth) -> Self {
        Self::with_api_base(spreadsheet_id, auth, SHEETS_API_BASE.to_string())
    }

    pub fn with_api_base(
        spreadsheet_id: String,
        auth: ServiceAccountAuth,
        api_base: String,
    ) -> Self {
        Self {
            spreadsheet_id,
            api_base,
            auth,
            client: reqwest::Client::new(),
        }
    }

    fn values_url(&self, range: &str) -> InvoiceParserResult<Url> {
        values_url(&self.api_base, &self.spreadsheet_id, range)
    }
}

/// `{base}/spreadsheets/{id}/values/{range}` with each segment percent-encoded.
fn values_url(api_base: &str, spreadsheet_id: &str, range: &str) -> InvoiceParserResult<Url> {
    let mut url = Url::parse(api_base).map_err(|e| {
        InvoiceParserError::Config(format!("invalid Sheets API base '{api_base}': {e}"))
    })?;
    url.path_segments_mut()
        .map_err(|_| {
            InvoiceParserError::Config(format!("Sheets API base '{api_base}' cannot carry a path"))
        })?
        .pop_if_empty()
        .extend(["spreadsheets", spreadsheet_id, "values", range]);
    Ok(url)
}

async fn check_status(response: reqwest::Response) -> InvoiceParserResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(InvoiceParserError::Sheets(format!("{status}: {body}")))
}

#[async_trait]
impl SheetStore for GoogleSheetsStore {
    fn name(&self) -> &str {
        &self.spreadsheet_id
    }

    async fn read(&self, range: &str) -> InvoiceParserResult<Vec<Row>> {
        let url = self.values_url(range)?;
        let token = self.auth.access_token().await?;
        tracing::debug!(spreadsheet_id = %self.spreadsheet_id, range, "reading values");

        let response = self.client.get(url).bearer_auth(token).send().await?;
        let body: ValueRange = check_status(response).await?.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(CellValue::from).collect())
            .collect())
    }

    async fn update(&self, range: &str, rows: &[Row]) -> InvoiceParserResult<()> {
        let mut url = self.values_url(range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let token = self.auth.access_token().await?;
        tracing::debug!(
            spreadsheet_id = %self.spreadsheet_id,
            range,
            rows = rows.len(),
            "updating values"
        );

        let body = ValueRangeBody {
            range,
            major_dimension: "ROWS",
            values: rows,
        };
        let response = self
            .client
            .put(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_values_url() {
        let url = values_url(SHEETS_API_BASE, "sheet-id", "A:D").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/A:D"
        );
    }

    #[test]
    fn encodes_qualified_ranges() {
        let base = "https://sheets.googleapis.com/v4/";
        let url = values_url(base, "id", "'My Invoices'!A7").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/id/values/'My%20Invoices'!A7"
        );
    }

    #[test]
    fn rejects_unparseable_base() {
        assert!(matches!(
            values_url("not a url", "id", "A1"),
            Err(InvoiceParserError::Config(_))
        ));
    }

    #[test]
    fn missing_values_mean_empty_table() {
        let body: ValueRange =
            serde_json::from_str(r#"{"range": "Sheet1!A1:D1000", "majorDimension": "ROWS"}"#)
                .unwrap();
        assert!(body.values.is_empty());
    }

    #[test]
    fn update_body_uses_rows_dimension() {
        let rows = vec![vec![
            CellValue::text("2024-01-15"),
            CellValue::Number(100.into()),
        ]];
        let body = ValueRangeBody {
            range: "A2",
            major_dimension: "ROWS",
            values: &rows,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "range": "A2",
                "majorDimension": "ROWS",
                "values": [["2024-01-15", 100]]
            })
        );
    }
}
