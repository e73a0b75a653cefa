// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use p2pcrawl::domain::models::listing::ListingRecord;
use p2pcrawl::domain::models::site::SummaryLocation;
use p2pcrawl::domain::repositories::sheet_repository::{
    RowRange, SinkError, TableHandle, TabularSink,
};
use p2pcrawl::infrastructure::workbook::InMemoryWorkbook;
use std::collections::HashSet;
use std::sync::Arc;

/// 在指定表上写入失败的内存输出
pub struct FlakySink {
    pub inner: Arc<InMemoryWorkbook>,
    failing_tables: HashSet<String>,
    fail_stamp: bool,
}

impl FlakySink {
    pub fn new(inner: Arc<InMemoryWorkbook>) -> Self {
        Self {
            inner,
            failing_tables: HashSet::new(),
            fail_stamp: false,
        }
    }

    pub fn failing_on(mut self, table: &str) -> Self {
        self.failing_tables.insert(table.to_string());
        self
    }

    pub fn failing_stamp(mut self) -> Self {
        self.fail_stamp = true;
        self
    }
}

#[async_trait]
impl TabularSink for FlakySink {
    async fn ensure_table(&self, key: &str) -> Result<TableHandle, SinkError> {
        self.inner.ensure_table(key).await
    }

    async fn clear(&self, handle: &TableHandle) -> Result<(), SinkError> {
        self.inner.clear(handle).await
    }

    async fn write_rows(
        &self,
        handle: &TableHandle,
        header: &[&str],
        rows: &[ListingRecord],
    ) -> Result<(), SinkError> {
        if self.failing_tables.contains(&handle.title) {
            return Err(SinkError::Http {
                status: 403,
                body: "PERMISSION_DENIED".to_string(),
            });
        }
        self.inner.write_rows(handle, header, rows).await
    }

    async fn stamp_completion(
        &self,
        summary: &SummaryLocation,
        rows: RowRange,
        timestamp: &str,
    ) -> Result<(), SinkError> {
        if self.fail_stamp {
            return Err(SinkError::Other("summary sheet is protected".to_string()));
        }
        self.inner.stamp_completion(summary, rows, timestamp).await
    }
}
