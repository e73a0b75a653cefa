// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::listing::{CrawlResult, TargetSpec};
use crate::domain::models::site::SiteProfile;
use crate::domain::models::tuning::CrawlTuning;
use crate::domain::services::extraction_service::PageExtractor;
use crate::domain::services::pagination_service::{AdvanceOutcome, PaginationController};
use crate::engines::traits::{BrowserSession, SessionError};
use metrics::{counter, histogram};
use std::time::Instant;
use tracing::{error, info};

/// 爬取服务
///
/// 驱动单个目标的"抽取当前页 -> 翻页"循环，按访问顺序拼接各页记录。
/// 这是单个市场的故障隔离边界：循环中的任何错误都在这里被记录，
/// 并返回到目前为止累积的部分结果。
pub struct CrawlService<'a, S: BrowserSession> {
    session: &'a S,
    profile: &'a SiteProfile,
    tuning: &'a CrawlTuning,
}

impl<'a, S: BrowserSession> CrawlService<'a, S> {
    pub fn new(session: &'a S, profile: &'a SiteProfile, tuning: &'a CrawlTuning) -> Self {
        Self {
            session,
            profile,
            tuning,
        }
    }

    /// 爬取已导航到的目标
    ///
    /// # 参数
    ///
    /// * `target` - 当前会话所在的目标
    ///
    /// # 返回值
    ///
    /// 总是返回结果；中途失败时 `failure` 记录原因
    pub async fn crawl(&self, target: &TargetSpec) -> CrawlResult {
        let started = Instant::now();
        let mut result = CrawlResult::new(target.code());

        if let Err(e) = self.drive(&mut result).await {
            error!(
                "Crawl of {} failed after {} pages: {}",
                target.code(),
                result.pages_visited,
                e
            );
            result.failure = Some(e.to_string());
        }

        histogram!("p2p_target_crawl_seconds", "site" => self.profile.kind.to_string())
            .record(started.elapsed().as_secs_f64());
        info!(
            "Crawled {}: {} records from {} pages",
            target.code(),
            result.records.len(),
            result.pages_visited
        );
        result
    }

    async fn drive(&self, result: &mut CrawlResult) -> Result<(), SessionError> {
        let extractor = PageExtractor::new(self.profile);
        let mut pagination = PaginationController::new(self.session, self.profile, self.tuning);

        pagination.start().await;
        let mut page = 1;
        loop {
            let batch = extractor.extract_page(self.session, page).await?;
            info!(
                "{} page {}: {} records from {} rows",
                result.code,
                page,
                batch.records.len(),
                batch.rows_seen
            );
            counter!("p2p_pages_visited_total", "site" => self.profile.kind.to_string())
                .increment(1);
            result.push_page(batch);

            match pagination.advance().await {
                AdvanceOutcome::Advanced(next) => page = next,
                AdvanceOutcome::Terminated(reason) => {
                    result.termination = Some(reason);
                    return Ok(());
                }
            }
        }
    }
}
