// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use metrics::counter;
use tracing::{error, info, warn};

use crate::domain::models::listing::{CrawlResult, TargetSpec, SHEET_HEADER};
use crate::domain::models::site::{SiteKind, SiteProfile};
use crate::domain::models::tuning::CrawlTuning;
use crate::domain::repositories::sheet_repository::{RowRange, TabularSink};
use crate::domain::services::crawl_service::CrawlService;
use crate::domain::services::obstruction_service::ObstructionHandler;
use crate::domain::services::pagination_service::TerminationReason;
use crate::engines::traits::{BrowserSession, SessionError};
use crate::utils::errors::{TargetError, WorkerError};
use crate::workers::worker::Worker;

/// 完成时间戳格式
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 单个目标的处理摘要
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSummary {
    pub code: String,
    pub records: usize,
    pub pages: u32,
    pub termination: Option<TerminationReason>,
    /// 爬取中途失败，只写入了部分记录
    pub partial: bool,
}

impl From<&CrawlResult> for TargetSummary {
    fn from(result: &CrawlResult) -> Self {
        Self {
            code: result.code.clone(),
            records: result.records.len(),
            pages: result.pages_visited,
            termination: result.termination.clone(),
            partial: result.is_partial(),
        }
    }
}

/// 一次站点运行的报告
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub site: SiteKind,
    /// 已写入输出的目标，按处理顺序
    pub completed: Vec<TargetSummary>,
    /// 失败的目标代码及原因
    pub failed: Vec<(String, String)>,
    /// 完成时间戳是否写入成功
    pub stamped: bool,
}

impl RunReport {
    fn new(site: SiteKind) -> Self {
        Self {
            site,
            completed: Vec::new(),
            failed: Vec::new(),
            stamped: false,
        }
    }
}

/// 市场运行工作器
///
/// 独占一个浏览器会话，按配置顺序逐个处理目标：导航、爬取、写入输出。
/// 单个目标的失败只记录日志，不影响后续目标。所有目标处理完后
/// 在汇总位置写入一次完成时间戳。
pub struct MarketWorker<S: BrowserSession> {
    name: String,
    session: S,
    sink: Arc<dyn TabularSink>,
    profile: SiteProfile,
    tuning: CrawlTuning,
    targets: Vec<TargetSpec>,
}

impl<S: BrowserSession> MarketWorker<S> {
    pub fn new(
        session: S,
        sink: Arc<dyn TabularSink>,
        profile: SiteProfile,
        tuning: CrawlTuning,
        targets: Vec<TargetSpec>,
    ) -> Self {
        Self {
            name: format!("{}-market-worker", profile.kind),
            session,
            sink,
            profile,
            tuning,
            targets,
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// 按顺序处理所有目标
    pub async fn run_targets(&self) -> RunReport {
        let site = self.profile.kind.to_string();
        let mut report = RunReport::new(self.profile.kind);
        let total = self.targets.len();

        for (index, target) in self.targets.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.tuning.inter_target_delay).await;
            }
            info!("Processing {} ({}/{})", target.code(), index + 1, total);

            match self.process_target(target).await {
                Ok(summary) => {
                    counter!("p2p_targets_completed_total", "site" => site.clone()).increment(1);
                    report.completed.push(summary);
                }
                Err(e) => {
                    error!("Target {} failed: {}", target.code(), e);
                    counter!("p2p_targets_failed_total", "site" => site.clone()).increment(1);
                    report.failed.push((target.code().to_string(), e.to_string()));
                }
            }
        }

        report.stamped = self.stamp_completion().await;
        info!(
            "{} run finished: {} completed, {} failed",
            site,
            report.completed.len(),
            report.failed.len()
        );
        report
    }

    async fn process_target(&self, target: &TargetSpec) -> Result<TargetSummary, TargetError> {
        self.session
            .navigate(target.url())
            .await
            .map_err(TargetError::Navigation)?;

        ObstructionHandler::new(&self.profile.obstructions, &self.tuning)
            .dismiss(&self.session)
            .await;

        let result = CrawlService::new(&self.session, &self.profile, &self.tuning)
            .crawl(target)
            .await;
        if let Some(failure) = &result.failure {
            if result.pages_visited == 0 {
                return Err(TargetError::Crawl(failure.clone()));
            }
            warn!(
                "Writing {} records collected for {} before the crawl failed: {}",
                result.records.len(),
                target.code(),
                failure
            );
        }

        let handle = self.sink.ensure_table(target.code()).await?;
        self.sink.clear(&handle).await?;
        self.sink
            .write_rows(&handle, &SHEET_HEADER, &result.records)
            .await?;
        info!(
            "Wrote {} records for {}",
            result.records.len(),
            target.code()
        );

        Ok(TargetSummary::from(&result))
    }

    async fn stamp_completion(&self) -> bool {
        let summary = &self.profile.summary;
        let Some(rows) = RowRange::covering(summary.first_row, self.targets.len()) else {
            return false;
        };
        let timestamp = Local::now().format(STAMP_FORMAT).to_string();

        match self.sink.stamp_completion(summary, rows, &timestamp).await {
            Ok(()) => {
                info!("Timestamp {} written to {}", timestamp, rows.a1(summary));
                true
            }
            Err(e) => {
                error!("Failed to write completion timestamp: {}", e);
                false
            }
        }
    }

    /// 关闭浏览器会话
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.session.close().await
    }
}

#[async_trait]
impl<S: BrowserSession> Worker for MarketWorker<S> {
    async fn run(&self) -> Result<(), WorkerError> {
        let report = self.run_targets().await;
        if !report.stamped && !self.targets.is_empty() {
            return Err(WorkerError::Sink(
                "completion timestamp was not written".to_string(),
            ));
        }
        if !report.failed.is_empty() {
            return Err(WorkerError::TargetsFailed(report.failed.len()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
