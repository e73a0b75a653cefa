// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::RwLock;

use crate::config::settings::SinkSettings;
use crate::domain::models::listing::ListingRecord;
use crate::domain::models::site::SummaryLocation;
use crate::domain::repositories::sheet_repository::{
    RowRange, SinkError, TableHandle, TabularSink,
};
use crate::infrastructure::google_sheets::GoogleSheetsSink;
use crate::utils::retry_policy::RetryPolicy;

/// 列字母转为从0开始的列号，例如 `D` -> 3
pub fn column_index(column: &str) -> Option<usize> {
    if column.is_empty() {
        return None;
    }
    column
        .chars()
        .try_fold(0usize, |acc, c| {
            let c = c.to_ascii_uppercase();
            c.is_ascii_uppercase()
                .then(|| acc * 26 + (c as usize - 'A' as usize + 1))
        })
        .map(|n| n - 1)
}

/// 单元格网格，第一行对应表格第1行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub cells: Vec<Vec<String>>,
}

impl Grid {
    /// 表头加记录的显示行
    pub fn from_records(header: &[&str], rows: &[ListingRecord]) -> Self {
        let mut cells = Vec::with_capacity(rows.len() + 1);
        cells.push(header.iter().map(|h| h.to_string()).collect());
        cells.extend(rows.iter().map(ListingRecord::to_display_row));
        Self { cells }
    }

    /// 设置单元格，`row` 从1开始，网格按需扩展
    pub fn set(&mut self, row: u32, column: usize, value: &str) {
        let row = row.max(1) as usize - 1;
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let line = &mut self.cells[row];
        if line.len() <= column {
            line.resize(column + 1, String::new());
        }
        line[column] = value.to_string();
    }

    /// 在汇总区间写入时间戳
    pub fn stamp(
        &mut self,
        summary: &SummaryLocation,
        rows: RowRange,
        timestamp: &str,
    ) -> Result<(), SinkError> {
        let column = column_index(&summary.column)
            .ok_or_else(|| SinkError::Other(format!("invalid column {}", summary.column)))?;
        for row in rows.first..=rows.last {
            self.set(row, column, timestamp);
        }
        Ok(())
    }

    /// 数据行 (不含表头) 还原为记录
    pub fn records(&self) -> Result<Vec<ListingRecord>, SinkError> {
        self.cells
            .iter()
            .skip(1)
            .map(|row| {
                ListingRecord::from_display_row(row).map_err(|e| SinkError::Malformed(e.to_string()))
            })
            .collect()
    }
}

/// 本地工作簿
///
/// 每个表保存为目录下的一个JSON文件
pub struct LocalWorkbook {
    root: PathBuf,
}

impl LocalWorkbook {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn table_path(&self, title: &str) -> PathBuf {
        self.root.join(format!("{}.json", title))
    }

    /// 读取表内容，表不存在时返回 `None`
    pub async fn read(&self, title: &str) -> Result<Option<Grid>, SinkError> {
        match fs::read(self.table_path(title)).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SinkError::Io(e)),
        }
    }

    async fn save(&self, title: &str, grid: &Grid) -> Result<(), SinkError> {
        let path = self.table_path(title);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, serde_json::to_vec_pretty(grid)?).await?;
        Ok(())
    }
}

#[async_trait]
impl TabularSink for LocalWorkbook {
    async fn ensure_table(&self, key: &str) -> Result<TableHandle, SinkError> {
        if self.read(key).await?.is_none() {
            self.save(key, &Grid::default()).await?;
        }
        Ok(TableHandle {
            title: key.to_string(),
            sheet_id: None,
        })
    }

    async fn clear(&self, handle: &TableHandle) -> Result<(), SinkError> {
        self.save(&handle.title, &Grid::default()).await
    }

    async fn write_rows(
        &self,
        handle: &TableHandle,
        header: &[&str],
        rows: &[ListingRecord],
    ) -> Result<(), SinkError> {
        self.save(&handle.title, &Grid::from_records(header, rows))
            .await
    }

    async fn stamp_completion(
        &self,
        summary: &SummaryLocation,
        rows: RowRange,
        timestamp: &str,
    ) -> Result<(), SinkError> {
        let mut grid = self.read(&summary.table).await?.unwrap_or_default();
        grid.stamp(summary, rows, timestamp)?;
        self.save(&summary.table, &grid).await
    }
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Grid>,
    order: Vec<String>,
}

/// 内存工作簿，用于测试和试运行
#[derive(Default)]
pub struct InMemoryWorkbook {
    state: RwLock<MemoryState>,
}

impl InMemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 表内容
    pub async fn table(&self, title: &str) -> Option<Grid> {
        self.state.read().await.tables.get(title).cloned()
    }

    /// 按创建顺序列出表名
    pub async fn table_names(&self) -> Vec<String> {
        self.state.read().await.order.clone()
    }
}

#[async_trait]
impl TabularSink for InMemoryWorkbook {
    async fn ensure_table(&self, key: &str) -> Result<TableHandle, SinkError> {
        let mut state = self.state.write().await;
        if !state.tables.contains_key(key) {
            state.tables.insert(key.to_string(), Grid::default());
            state.order.push(key.to_string());
        }
        Ok(TableHandle {
            title: key.to_string(),
            sheet_id: None,
        })
    }

    async fn clear(&self, handle: &TableHandle) -> Result<(), SinkError> {
        let mut state = self.state.write().await;
        let grid = state
            .tables
            .get_mut(&handle.title)
            .ok_or_else(|| SinkError::Other(format!("no table named {}", handle.title)))?;
        *grid = Grid::default();
        Ok(())
    }

    async fn write_rows(
        &self,
        handle: &TableHandle,
        header: &[&str],
        rows: &[ListingRecord],
    ) -> Result<(), SinkError> {
        let mut state = self.state.write().await;
        let grid = state
            .tables
            .get_mut(&handle.title)
            .ok_or_else(|| SinkError::Other(format!("no table named {}", handle.title)))?;
        *grid = Grid::from_records(header, rows);
        Ok(())
    }

    async fn stamp_completion(
        &self,
        summary: &SummaryLocation,
        rows: RowRange,
        timestamp: &str,
    ) -> Result<(), SinkError> {
        let mut state = self.state.write().await;
        if !state.tables.contains_key(&summary.table) {
            state.order.push(summary.table.clone());
        }
        state
            .tables
            .entry(summary.table.clone())
            .or_default()
            .stamp(summary, rows, timestamp)
    }
}

/// 输出工厂函数
///
/// # 参数
///
/// * `settings` - 输出配置
/// * `workbook` - 站点的工作簿标识
pub fn create_sink(
    settings: &SinkSettings,
    workbook: &str,
) -> Result<Arc<dyn TabularSink>, SinkError> {
    match settings.kind.as_str() {
        "local" => Ok(Arc::new(LocalWorkbook::new(
            Path::new(&settings.local_path).join(workbook),
        ))),
        "memory" => Ok(Arc::new(InMemoryWorkbook::new())),
        "google_sheets" => {
            let token = settings
                .access_token
                .clone()
                .ok_or_else(|| SinkError::Other("sink.access_token is required".to_string()))?;
            let retry = RetryPolicy {
                max_retries: settings.max_retries,
                ..RetryPolicy::default()
            };
            let sink = GoogleSheetsSink::new(
                &settings.sheets_api_base,
                workbook,
                token,
                Duration::from_secs(settings.request_timeout_secs),
                retry,
            )?;
            Ok(Arc::new(sink))
        }
        other => Err(SinkError::Other(format!("Unsupported sink type: {}", other))),
    }
}
