// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::pagination_service::TerminationReason;
use crate::utils::text_processing::{format_amount, parse_decimal};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// 广告主缺失时使用的占位名称
pub const UNKNOWN_ADVERTISER: &str = "unknown";

/// 输出表头，顺序与 [`ListingRecord::to_cells`] 一致
pub const SHEET_HEADER: [&str; 4] = [
    "Advertiser Name",
    "Price",
    "Available Amount",
    "Payment Methods",
];

/// 挂单记录
///
/// 一个广告主在某一页上的报价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// 广告主名称
    pub advertiser: String,
    /// 单价
    pub price: f64,
    /// 可用数量
    pub available_quantity: f64,
    /// 支持的支付方式，保持页面顺序
    pub payment_methods: Vec<String>,
}

/// 单元格值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// 文本
    Text(String),
    /// 数值
    Number(f64),
}

impl Cell {
    /// 显示格式：数值保留两位小数并带千分位
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_amount(*n),
        }
    }
}

/// 行解析错误
#[derive(Error, Debug, PartialEq)]
pub enum RowParseError {
    #[error("expected 4 cells, got {0}")]
    WrongWidth(usize),
    #[error("column {column} is not a number: {value:?}")]
    NotANumber { column: &'static str, value: String },
}

impl ListingRecord {
    /// 支付方式合并为单个字符串
    pub fn joined_payment_methods(&self) -> String {
        self.payment_methods.join(", ")
    }

    /// 转换为表格单元格
    pub fn to_cells(&self) -> [Cell; 4] {
        [
            Cell::Text(self.advertiser.clone()),
            Cell::Number(self.price),
            Cell::Number(self.available_quantity),
            Cell::Text(self.joined_payment_methods()),
        ]
    }

    /// 转换为显示行
    pub fn to_display_row(&self) -> Vec<String> {
        self.to_cells().iter().map(Cell::display).collect()
    }

    /// 从显示行还原记录
    ///
    /// 数值精度为两位小数
    pub fn from_display_row(row: &[String]) -> Result<Self, RowParseError> {
        let [advertiser, price, quantity, methods] = row else {
            return Err(RowParseError::WrongWidth(row.len()));
        };

        let price = parse_decimal(price).ok_or_else(|| RowParseError::NotANumber {
            column: SHEET_HEADER[1],
            value: price.clone(),
        })?;
        let available_quantity =
            parse_decimal(quantity).ok_or_else(|| RowParseError::NotANumber {
                column: SHEET_HEADER[2],
                value: quantity.clone(),
            })?;
        let payment_methods = methods
            .split(", ")
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            advertiser: advertiser.clone(),
            price,
            available_quantity,
            payment_methods,
        })
    }
}

/// 单页抽取结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageBatch {
    /// 页码，从1开始
    pub page_index: u32,
    /// 页面上渲染出的行数 (不含跳过的表头行)
    pub rows_seen: usize,
    /// 有效记录，保持行顺序
    pub records: Vec<ListingRecord>,
}

impl PageBatch {
    /// 被丢弃的行数
    pub fn dropped(&self) -> usize {
        self.rows_seen.saturating_sub(self.records.len())
    }
}

/// 单个目标的爬取结果
///
/// 按访问顺序拼接所有页面的记录
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    /// 货币/市场代码
    pub code: String,
    /// 所有记录
    pub records: Vec<ListingRecord>,
    /// 已访问页数
    pub pages_visited: u32,
    /// 分页结束原因
    pub termination: Option<TerminationReason>,
    /// 中途失败原因，存在时结果为部分结果
    pub failure: Option<String>,
}

impl CrawlResult {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    /// 追加一页
    pub fn push_page(&mut self, batch: PageBatch) {
        self.pages_visited += 1;
        self.records.extend(batch.records);
    }

    pub fn is_partial(&self) -> bool {
        self.failure.is_some()
    }
}

/// 目标构造错误
#[derive(Error, Debug)]
pub enum TargetSpecError {
    #[error("market code must not be empty")]
    EmptyCode,
    #[error("URL template has no {{currency}} placeholder: {0}")]
    MissingPlaceholder(String),
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// 爬取目标
///
/// 一个市场/货币代码及其完整的列表页URL，构造后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    code: String,
    url: String,
}

impl TargetSpec {
    /// URL模板中的占位符
    pub const PLACEHOLDER: &'static str = "{currency}";

    pub fn new(code: impl Into<String>, url: impl Into<String>) -> Result<Self, TargetSpecError> {
        let code = code.into();
        let url = url.into();
        if code.trim().is_empty() {
            return Err(TargetSpecError::EmptyCode);
        }
        Url::parse(&url).map_err(|source| TargetSpecError::InvalidUrl {
            url: url.clone(),
            source,
        })?;
        Ok(Self { code, url })
    }

    /// 使用URL模板构造目标
    pub fn from_template(template: &str, code: &str) -> Result<Self, TargetSpecError> {
        if !template.contains(Self::PLACEHOLDER) {
            return Err(TargetSpecError::MissingPlaceholder(template.to_string()));
        }
        Self::new(code, template.replace(Self::PLACEHOLDER, code))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
