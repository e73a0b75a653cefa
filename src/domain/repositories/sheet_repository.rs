// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::listing::ListingRecord;
use crate::domain::models::site::SummaryLocation;
use async_trait::async_trait;
use thiserror::Error;

/// 输出错误类型
#[derive(Error, Debug)]
pub enum SinkError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// 请求失败
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// 远端返回错误状态
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// 响应格式不符合预期
    #[error("Unexpected response: {0}")]
    Malformed(String),
    /// 其他错误
    #[error("Sink error: {0}")]
    Other(String),
}

impl SinkError {
    /// 判断错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            SinkError::Transport(e) => e.is_timeout() || e.is_connect(),
            SinkError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// 表句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    /// 表名 (即市场代码)
    pub title: String,
    /// 远端表格的数字ID，本地实现为 `None`
    pub sheet_id: Option<i64>,
}

/// 汇总表中的行区间，闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub first: u32,
    pub last: u32,
}

impl RowRange {
    /// 从起始行开始覆盖 `count` 行
    ///
    /// `count` 为0时返回 `None`
    pub fn covering(first: u32, count: usize) -> Option<Self> {
        if count == 0 {
            return None;
        }
        Some(Self {
            first,
            last: first + count as u32 - 1,
        })
    }

    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A1 表示法，例如 `Main!D2:D94`
    pub fn a1(&self, summary: &SummaryLocation) -> String {
        format!(
            "{}!{}{}:{}{}",
            summary.table, summary.column, self.first, summary.column, self.last
        )
    }
}

/// 表格输出特质
///
/// 以市场代码为键的外部表格存储
#[async_trait]
pub trait TabularSink: Send + Sync {
    /// 获取表，不存在时创建
    async fn ensure_table(&self, key: &str) -> Result<TableHandle, SinkError>;

    /// 清空表内容
    async fn clear(&self, handle: &TableHandle) -> Result<(), SinkError>;

    /// 写入表头和记录
    async fn write_rows(
        &self,
        handle: &TableHandle,
        header: &[&str],
        rows: &[ListingRecord],
    ) -> Result<(), SinkError>;

    /// 在汇总位置写入完成时间戳
    async fn stamp_completion(
        &self,
        summary: &SummaryLocation,
        rows: RowRange,
        timestamp: &str,
    ) -> Result<(), SinkError>;
}
