// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::listing::{ListingRecord, PageBatch, UNKNOWN_ADVERTISER};
use crate::domain::models::site::{FieldSelectors, NumericField, NumericStrategy, SiteProfile};
use crate::engines::traits::{BrowserSession, SessionError};
use crate::utils::text_processing::first_positive_token;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

/// 字段未取到的原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldMiss {
    /// 没有匹配的元素
    #[error("no element matched {0}")]
    ElementMissing(String),
    /// 文本无法解析
    #[error("could not parse {0:?}")]
    Unparseable(String),
    /// 只解析出0
    #[error("only zero values found")]
    ParsedZero,
    /// 会话错误
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// 行抽取器
///
/// 从一行中抽取广告主、价格、数量和支付方式。
/// 每个字段独立失败，失败的字段取默认值；所有字段都失败时该行被丢弃。
pub struct RowExtractor<'a> {
    fields: &'a FieldSelectors,
}

impl<'a> RowExtractor<'a> {
    pub fn new(fields: &'a FieldSelectors) -> Self {
        Self { fields }
    }

    /// 抽取一行
    ///
    /// # 返回值
    ///
    /// 至少一个字段取到非默认值时返回记录，否则返回 `None`
    pub async fn extract<S: BrowserSession>(
        &self,
        session: &S,
        row: &S::Element,
    ) -> Option<ListingRecord> {
        let advertiser = self.advertiser(session, row).await;
        let price = self.numeric(session, row, &self.fields.price).await;
        let quantity = self.numeric(session, row, &self.fields.quantity).await;
        let payment_methods = self.payment_methods(session, row).await;

        if advertiser.is_err() && price.is_err() && quantity.is_err() && payment_methods.is_err()
        {
            debug!(
                "Row dropped: advertiser={:?}, price={:?}, quantity={:?}, payment_methods={:?}",
                advertiser.err(),
                price.err(),
                quantity.err(),
                payment_methods.err()
            );
            return None;
        }

        Some(ListingRecord {
            advertiser: advertiser.unwrap_or_else(|_| UNKNOWN_ADVERTISER.to_string()),
            price: price.unwrap_or(0.0),
            available_quantity: quantity.unwrap_or(0.0),
            payment_methods: payment_methods.unwrap_or_default(),
        })
    }

    async fn advertiser<S: BrowserSession>(
        &self,
        session: &S,
        row: &S::Element,
    ) -> Result<String, FieldMiss> {
        let mut miss = FieldMiss::ElementMissing(self.fields.advertiser.join(", "));
        for selector in &self.fields.advertiser {
            match self.first_text(session, row, selector).await {
                Ok(text) if !text.is_empty() => return Ok(text),
                Ok(text) => miss = FieldMiss::Unparseable(text),
                Err(e) => miss = e,
            }
        }
        Err(miss)
    }

    /// 数值字段：依次尝试各策略，第一个正数胜出；
    /// 都没有正数时做通用数值搜索
    async fn numeric<S: BrowserSession>(
        &self,
        session: &S,
        row: &S::Element,
        field: &NumericField,
    ) -> Result<f64, FieldMiss> {
        let mut saw_zero = false;
        let mut miss = None;

        for strategy in &field.strategies {
            match self.apply_strategy(session, row, strategy).await {
                Ok(value) if value > 0.0 => return Ok(value),
                Ok(_) => saw_zero = true,
                Err(e) => miss = Some(e),
            }
        }

        if let Some(candidates) = &field.fallback_candidates {
            match self.search_candidates(session, row, candidates).await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => miss = Some(e),
            }
        }

        if saw_zero {
            return Err(FieldMiss::ParsedZero);
        }
        Err(miss.unwrap_or_else(|| FieldMiss::ElementMissing(String::new())))
    }

    async fn apply_strategy<S: BrowserSession>(
        &self,
        session: &S,
        row: &S::Element,
        strategy: &NumericStrategy,
    ) -> Result<f64, FieldMiss> {
        let text = self.first_text(session, row, &strategy.selector).await?;
        strategy
            .format
            .parse(&text)
            .ok_or(FieldMiss::Unparseable(text))
    }

    async fn search_candidates<S: BrowserSession>(
        &self,
        session: &S,
        row: &S::Element,
        candidates: &str,
    ) -> Result<Option<f64>, FieldMiss> {
        let elements = session.find_all(candidates, Some(row)).await?;
        for element in &elements {
            let Ok(text) = session.text(element).await else {
                continue;
            };
            if let Some(value) = first_positive_token(&text) {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    async fn payment_methods<S: BrowserSession>(
        &self,
        session: &S,
        row: &S::Element,
    ) -> Result<Vec<String>, FieldMiss> {
        let mut miss = FieldMiss::ElementMissing(self.fields.payment_methods.join(", "));
        for selector in &self.fields.payment_methods {
            let elements = match session.find_all(selector, Some(row)).await {
                Ok(elements) => elements,
                Err(e) => {
                    miss = e.into();
                    continue;
                }
            };

            let mut methods = Vec::with_capacity(elements.len());
            for element in &elements {
                match session.text(element).await {
                    Ok(text) if !text.trim().is_empty() => methods.push(text.trim().to_string()),
                    Ok(_) => {}
                    Err(e) => miss = e.into(),
                }
            }
            if !methods.is_empty() {
                return Ok(methods);
            }
            if !matches!(miss, FieldMiss::Session(_)) {
                miss = FieldMiss::ElementMissing(selector.clone());
            }
        }
        Err(miss)
    }

    async fn first_text<S: BrowserSession>(
        &self,
        session: &S,
        row: &S::Element,
        selector: &str,
    ) -> Result<String, FieldMiss> {
        let element = session
            .find_first(selector, Some(row))
            .await?
            .ok_or_else(|| FieldMiss::ElementMissing(selector.to_string()))?;
        Ok(session.text(&element).await?.trim().to_string())
    }
}

/// 页面抽取器
///
/// 对当前页面的每一行应用行抽取器，保持行顺序
pub struct PageExtractor<'a> {
    profile: &'a SiteProfile,
    rows: RowExtractor<'a>,
}

impl<'a> PageExtractor<'a> {
    pub fn new(profile: &'a SiteProfile) -> Self {
        Self {
            profile,
            rows: RowExtractor::new(&profile.fields),
        }
    }

    /// 抽取当前页面
    ///
    /// 没有行时返回空批次；只有查询行本身失败时返回错误
    pub async fn extract_page<S: BrowserSession>(
        &self,
        session: &S,
        page_index: u32,
    ) -> Result<PageBatch, SessionError> {
        let rows = session.find_all(&self.profile.row_selector, None).await?;
        let mut batch = PageBatch {
            page_index,
            ..Default::default()
        };

        for (row_index, row) in rows.iter().enumerate().skip(self.profile.skip_leading_rows) {
            batch.rows_seen += 1;
            match self.rows.extract(session, row).await {
                Some(record) => batch.records.push(record),
                None => debug!("Row {} on page {} has no valid data", row_index, page_index),
            }
        }

        if batch.rows_seen == 0 {
            warn!("No rows found on page {}", page_index);
        } else if batch.records.is_empty() {
            warn!(
                "{} rows on page {} produced no usable records",
                batch.rows_seen, page_index
            );
        }

        counter!("p2p_records_extracted_total", "site" => self.profile.kind.to_string())
            .increment(batch.records.len() as u64);
        counter!("p2p_rows_dropped_total", "site" => self.profile.kind.to_string())
            .increment(batch.dropped() as u64);

        Ok(batch)
    }
}
