use super::{Ledger, LedgerCell, token::TokenSource};
use crate::analysis::ScoreBand;
use crate::config::Sheets;
use crate::error::ReviewError;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const TARGET: &str = "sheets";
const SCORE_COLUMN: u32 = 5;

/// Sheets v4 ledger on one tab of one spreadsheet.
pub struct SheetsLedger {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_range: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

impl SheetsLedger {
    pub fn new(cfg: &Sheets, spreadsheet_id: &str, tokens: Arc<dyn TokenSource>) -> Result<Self, ReviewError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ReviewError::archival(TARGET, e))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: cfg.sheet_name.clone(),
            tokens,
        })
    }

    fn range(&self, cells: &str) -> String {
        format!("'{}'!{cells}", self.sheet_name.replace('\'', "''"))
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        )
    }

    fn send(&self, req: RequestBuilder) -> Result<Response, ReviewError> {
        let token = self.tokens.access_token()?;
        let resp = req
            .bearer_auth(token)
            .send()
            .map_err(|e| ReviewError::archival(TARGET, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ReviewError::archival(
                TARGET,
                format!("HTTP {}: {}", status.as_u16(), body),
            ));
        }
        Ok(resp)
    }

    fn json<T: for<'de> Deserialize<'de>>(&self, req: RequestBuilder) -> Result<T, ReviewError> {
        self.send(req)?
            .json()
            .map_err(|e| ReviewError::archival(TARGET, format!("decoding response: {e}")))
    }

    /// Numeric id of the configured tab, proving the spreadsheet is reachable.
    pub fn check_access(&self) -> Result<i64, ReviewError> {
        self.sheet_id()
    }

    fn sheet_id(&self) -> Result<i64, ReviewError> {
        let req = self
            .http
            .get(format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id))
            .query(&[("fields", "sheets.properties(sheetId,title)")]);
        let meta: SpreadsheetMeta = self.json(req)?;
        meta.sheets
            .into_iter()
            .find(|s| s.properties.title == self.sheet_name)
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| {
                ReviewError::archival(TARGET, format!("no tab named {:?}", self.sheet_name))
            })
    }

    fn write_header(&self, header: &[&str]) -> Result<(), ReviewError> {
        let req = self
            .http
            .put(self.values_url(&self.range("A1")))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [header] }));
        self.send(req)?;
        info!("ledger header written");
        Ok(())
    }
}

impl Ledger for SheetsLedger {
    fn ensure_header(&self, header: &[&str]) -> Result<(), ReviewError> {
        let last_col = column_letter(header.len().saturating_sub(1) as u32);
        let req = self.http.get(self.values_url(&self.range(&format!("A1:{last_col}1"))));
        let current: ValueRange = self.json(req)?;
        let first_row: Vec<String> = current
            .values
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();

        match header_action(&first_row, header) {
            HeaderAction::Keep => Ok(()),
            HeaderAction::Write => self.write_header(header),
            HeaderAction::Skip => {
                warn!("ledger row 1 holds data, not a header; leaving it untouched");
                Ok(())
            }
        }
    }

    fn append_row(&self, row: &[LedgerCell]) -> Result<Option<u32>, ReviewError> {
        let values: Vec<serde_json::Value> = row.iter().map(LedgerCell::to_cell_value).collect();
        let req = self
            .http
            .post(format!("{}:append", self.values_url(&self.range("A1"))))
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [values] }));
        let resp: AppendResponse = self.json(req)?;
        Ok(resp
            .updates
            .and_then(|u| row_of_range(&u.updated_range)))
    }

    fn format_score_cell(&self, row: u32, band: ScoreBand) -> Result<(), ReviewError> {
        let sheet_id = self.sheet_id()?;
        let (red, green, blue) = match band {
            ScoreBand::Fail => (0.95, 0.3, 0.3),
            ScoreBand::Warn => (1.0, 0.8, 0.4),
            ScoreBand::Pass => (0.3, 0.7, 0.3),
        };
        let body = json!({
            "requests": [{
                "repeatCell": {
                    "range": {
                        "sheetId": sheet_id,
                        "startRowIndex": row.saturating_sub(1),
                        "endRowIndex": row,
                        "startColumnIndex": SCORE_COLUMN,
                        "endColumnIndex": SCORE_COLUMN + 1,
                    },
                    "cell": {
                        "userEnteredFormat": {
                            "backgroundColor": { "red": red, "green": green, "blue": blue },
                            "textFormat": { "bold": true },
                            "horizontalAlignment": "CENTER",
                        }
                    },
                    "fields": "userEnteredFormat(backgroundColor,textFormat,horizontalAlignment)",
                }
            }]
        });
        let req = self
            .http
            .post(format!(
                "{}/spreadsheets/{}:batchUpdate",
                self.base_url, self.spreadsheet_id
            ))
            .json(&body);
        self.send(req)?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum HeaderAction {
    Keep,
    Write,
    Skip,
}

/// Row 1 is rewritten when empty or when it is an older header (first cell
/// `Timestamp`/`TS`); a row of data is never overwritten.
fn header_action(first_row: &[String], header: &[&str]) -> HeaderAction {
    let trimmed: Vec<&str> = first_row.iter().map(|s| s.trim()).collect();
    if trimmed == header {
        return HeaderAction::Keep;
    }
    match trimmed.first() {
        None => HeaderAction::Write,
        Some(first) if first.is_empty() && trimmed.iter().all(|c| c.is_empty()) => {
            HeaderAction::Write
        }
        Some(&"Timestamp") | Some(&"TS") => HeaderAction::Write,
        Some(_) => HeaderAction::Skip,
    }
}

/// 0 → A, 25 → Z, 26 → AA.
fn column_letter(mut index: u32) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Row number from an A1 range such as `'Sheet1'!A5:J5`.
fn row_of_range(range: &str) -> Option<u32> {
    let cells = range.rsplit('!').next()?;
    let first = cells.split(':').next()?;
    first
        .trim_start_matches(|c: char| c.is_ascii_alphabetic() || c == '$')
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [&str; 3] = ["Timestamp", "Brand", "Campaign"];

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn header_is_idempotent() {
        assert_eq!(header_action(&row(&HEADER), &HEADER), HeaderAction::Keep);
        assert_eq!(header_action(&[], &HEADER), HeaderAction::Write);
        assert_eq!(header_action(&row(&["TS", "Brand"]), &HEADER), HeaderAction::Write);
        assert_eq!(header_action(&row(&["2025-01-01", "Sol"]), &HEADER), HeaderAction::Skip);
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(9), "J");
        assert_eq!(column_letter(26), "AA");
    }

    #[test]
    fn appended_row_number() {
        assert_eq!(row_of_range("'Sheet1'!A12:J12"), Some(12));
        assert_eq!(row_of_range("Sheet1!A5:J5"), Some(5));
        assert_eq!(row_of_range(""), None);
    }
}
