//! Google Drive/Sheets document store adapter.

use std::time::Duration;

use log::{debug, info};
use serde_json::Value;

use crate::backends::{DocumentStore, SpreadsheetSummary};
use crate::sheet_sync::SheetDocument;

pub const DEFAULT_SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_DRIVE_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const SPREADSHEET_MIME_FILTER: &str = "mimeType='application/vnd.google-apps.spreadsheet'";
const WRITE_ROLES: [&str; 2] = ["owner", "writer"];

/// Sheets/Drive adapter authenticated with an OAuth access token.
pub struct GoogleSheetsStore {
    http_client: ureq::Agent,
    sheets_api_base_url: String,
    drive_api_base_url: String,
    access_token: String,
}

impl GoogleSheetsStore {
    pub fn new(sheets_api_base_url: &str, drive_api_base_url: &str, access_token: &str) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(20))
            .timeout_write(Duration::from_secs(20))
            .build();
        Self {
            http_client,
            sheets_api_base_url: sheets_api_base_url.trim().trim_end_matches('/').to_string(),
            drive_api_base_url: drive_api_base_url.trim().trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn get_json(&self, url: &str, action: &str) -> Result<Value, String> {
        debug!("Google GET {url}");
        self.http_client
            .get(url)
            .set("Authorization", &self.bearer())
            .set("Accept", "application/json")
            .call()
            .map_err(|err| format!("Google request failed ({action}): {err}"))?
            .into_json()
            .map_err(|err| format!("Google response parse failed ({action}): {err}"))
    }

    fn values_url(&self, doc_id: &str, range: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.sheets_api_base_url,
            urlencoding::encode(doc_id),
            urlencoding::encode(range)
        )
    }

    fn files_page_url(&self, page_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/files?corpora=user&q={}",
            self.drive_api_base_url,
            urlencoding::encode(SPREADSHEET_MIME_FILTER)
        );
        if let Some(page_token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(urlencoding::encode(page_token).as_ref());
        }
        url
    }

    fn parse_files(value: &Value) -> Vec<SpreadsheetSummary> {
        value
            .get("files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(|file| {
                        Some(SpreadsheetSummary {
                            id: file.get("id")?.as_str()?.to_string(),
                            name: file
                                .get("name")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn has_write_role(value: &Value) -> bool {
        value
            .get("permissions")
            .and_then(Value::as_array)
            .is_some_and(|permissions| {
                permissions.iter().any(|permission| {
                    permission
                        .get("role")
                        .and_then(Value::as_str)
                        .is_some_and(|role| WRITE_ROLES.contains(&role))
                })
            })
    }
}

impl DocumentStore for GoogleSheetsStore {
    fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetSummary>, String> {
        let mut spreadsheets = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.get_json(&self.files_page_url(page_token.as_deref()), "list files")?;
            let files = Self::parse_files(&page);
            debug!("{} files found", files.len());
            spreadsheets.extend(files);
            page_token = page
                .get("nextPageToken")
                .and_then(Value::as_str)
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }
        info!("Found {} spreadsheets", spreadsheets.len());
        Ok(spreadsheets)
    }

    fn can_write(&self, doc_id: &str) -> Result<bool, String> {
        let url = format!(
            "{}/files/{}/permissions",
            self.drive_api_base_url,
            urlencoding::encode(doc_id)
        );
        let permissions = self.get_json(&url, "list permissions")?;
        Ok(Self::has_write_role(&permissions))
    }

    fn load_range(&self, doc_id: &str, range: &str) -> Result<SheetDocument, String> {
        let value = self.get_json(&self.values_url(doc_id, range), "get values")?;
        serde_json::from_value(value)
            .map_err(|err| format!("Google values payload was not a value range: {err}"))
    }

    fn write_range(&self, doc_id: &str, document: &SheetDocument) -> Result<(), String> {
        let url = format!(
            "{}?valueInputOption=RAW",
            self.values_url(doc_id, &document.range)
        );
        debug!("Google PUT {url}");
        self.http_client
            .put(&url)
            .set("Authorization", &self.bearer())
            .send_json(document)
            .map_err(|err| format!("Google request failed (update values): {err}"))?;
        Ok(())
    }
}
