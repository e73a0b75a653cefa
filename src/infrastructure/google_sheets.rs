// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::models::listing::{Cell, ListingRecord};
use crate::domain::models::site::SummaryLocation;
use crate::domain::repositories::sheet_repository::{
    RowRange, SinkError, TableHandle, TabularSink,
};
use crate::utils::retry_policy::RetryPolicy;

/// 新建表的网格大小
const NEW_SHEET_ROWS: u32 = 1000;
const NEW_SHEET_COLUMNS: u32 = 10;

/// 价格和数量列的数值格式
const AMOUNT_PATTERN: &str = "#,##0.00";

/// Google Sheets 输出
///
/// 通过 Sheets v4 REST 接口写入一个表格文件，每个市场一个工作表
pub struct GoogleSheetsSink {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    access_token: String,
    retry: RetryPolicy,
}

impl GoogleSheetsSink {
    pub fn new(
        api_base: &str,
        spreadsheet_id: &str,
        access_token: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token,
            retry,
        })
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.api_base, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    async fn execute(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, SinkError> {
        let method = &method;
        self.retry
            .run(operation, move || async move {
                let mut request = self
                    .client
                    .request(method.clone(), url)
                    .bearer_auth(&self.access_token);
                if let Some(body) = body {
                    request = request.json(body);
                }

                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(SinkError::Http {
                        status: status.as_u16(),
                        body,
                    });
                }

                let text = response.text().await?;
                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                Ok(serde_json::from_str(&text)?)
            })
            .await
    }

    async fn find_sheet(&self, title: &str) -> Result<Option<i64>, SinkError> {
        let url = format!("{}?fields=sheets.properties", self.spreadsheet_url());
        let metadata = self.execute("list sheets", Method::GET, &url, None).await?;
        let sheets = metadata["sheets"].as_array().cloned().unwrap_or_default();

        Ok(sheets.iter().find_map(|sheet| {
            let properties = &sheet["properties"];
            (properties["title"].as_str() == Some(title))
                .then(|| properties["sheetId"].as_i64())
                .flatten()
        }))
    }

    async fn add_sheet(&self, title: &str) -> Result<i64, SinkError> {
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": NEW_SHEET_COLUMNS
                        }
                    }
                }
            }]
        });
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let reply = self
            .execute("add sheet", Method::POST, &url, Some(&body))
            .await?;

        reply["replies"][0]["addSheet"]["properties"]["sheetId"]
            .as_i64()
            .ok_or_else(|| SinkError::Malformed(format!("addSheet reply without sheetId: {}", reply)))
    }

    async fn format_amounts(&self, sheet_id: i64, rows: usize) -> Result<(), SinkError> {
        let body = json!({
            "requests": [{
                "repeatCell": {
                    "range": {
                        "sheetId": sheet_id,
                        "startRowIndex": 1,
                        "endRowIndex": rows + 1,
                        "startColumnIndex": 1,
                        "endColumnIndex": 3
                    },
                    "cell": {
                        "userEnteredFormat": {
                            "numberFormat": { "type": "NUMBER", "pattern": AMOUNT_PATTERN }
                        }
                    },
                    "fields": "userEnteredFormat.numberFormat"
                }
            }]
        });
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        self.execute("format amounts", Method::POST, &url, Some(&body))
            .await?;
        Ok(())
    }
}

/// 带引号的工作表名，用于A1范围
fn quoted(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// 表头加记录，数值保持为数字
pub fn sheet_values(header: &[&str], rows: &[ListingRecord]) -> Vec<Vec<Cell>> {
    let mut values = Vec::with_capacity(rows.len() + 1);
    values.push(header.iter().map(|h| Cell::Text(h.to_string())).collect());
    values.extend(rows.iter().map(|r| r.to_cells().to_vec()));
    values
}

#[async_trait]
impl TabularSink for GoogleSheetsSink {
    async fn ensure_table(&self, key: &str) -> Result<TableHandle, SinkError> {
        let sheet_id = match self.find_sheet(key).await? {
            Some(id) => {
                debug!("Updating existing worksheet for {}", key);
                id
            }
            None => {
                let id = self.add_sheet(key).await?;
                info!("Created new worksheet for {}", key);
                id
            }
        };
        Ok(TableHandle {
            title: key.to_string(),
            sheet_id: Some(sheet_id),
        })
    }

    async fn clear(&self, handle: &TableHandle) -> Result<(), SinkError> {
        let url = format!("{}:clear", self.values_url(&quoted(&handle.title)));
        self.execute("clear sheet", Method::POST, &url, Some(&json!({})))
            .await?;
        Ok(())
    }

    async fn write_rows(
        &self,
        handle: &TableHandle,
        header: &[&str],
        rows: &[ListingRecord],
    ) -> Result<(), SinkError> {
        let range = format!("{}!A1:D{}", quoted(&handle.title), rows.len() + 1);
        let url = format!("{}?valueInputOption=RAW", self.values_url(&range));
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": sheet_values(header, rows),
        });
        self.execute("write rows", Method::PUT, &url, Some(&body))
            .await?;

        match handle.sheet_id {
            Some(sheet_id) if !rows.is_empty() => self.format_amounts(sheet_id, rows.len()).await,
            _ => Ok(()),
        }
    }

    async fn stamp_completion(
        &self,
        summary: &SummaryLocation,
        rows: RowRange,
        timestamp: &str,
    ) -> Result<(), SinkError> {
        let range = rows.a1(summary);
        let url = format!("{}?valueInputOption=RAW", self.values_url(&range));
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": vec![vec![timestamp]; rows.len()],
        });
        self.execute("stamp completion", Method::PUT, &url, Some(&body))
            .await?;
        Ok(())
    }
}
