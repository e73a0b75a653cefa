// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::site::{DisabledMarker, SiteProfile};
use crate::domain::models::tuning::CrawlTuning;
use crate::domain::services::obstruction_service::ObstructionHandler;
use crate::engines::traits::{BrowserSession, SessionError};
use crate::engines::wait::{wait_for_all, wait_for_selector};
use std::fmt;
use tracing::{debug, info, warn};

/// 分页结束原因
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationReason {
    /// 已到达页面声明的最大页码
    MaxPageReached(u32),
    /// 找不到下一页按钮
    NextControlMissing,
    /// 下一页按钮被禁用
    NextControlDisabled,
    /// 点击下一页失败 (包括回退路径)
    AdvanceFailed(String),
    /// 达到单个目标的页数上限
    PageCapReached(u32),
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TerminationReason::MaxPageReached(n) => write!(f, "reached last page {}", n),
            TerminationReason::NextControlMissing => write!(f, "next-page control not found"),
            TerminationReason::NextControlDisabled => write!(f, "next-page control disabled"),
            TerminationReason::AdvanceFailed(e) => write!(f, "advance failed: {}", e),
            TerminationReason::PageCapReached(n) => write!(f, "page cap of {} reached", n),
        }
    }
}

/// 分页阶段
#[derive(Debug, Clone, PartialEq)]
pub enum PaginationPhase {
    AwaitingFirstLoad,
    HasPage(u32),
    Terminated(TerminationReason),
}

/// 分页状态快照
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationState {
    /// 当前页码，从1开始；开始前为0
    pub current_page_index: u32,
    /// 页面声明的最大页码，未知为 `None`
    pub known_max_page: Option<u32>,
    pub terminated: bool,
}

/// 页面加载结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    Loaded,
    /// 等待超时，按已渲染的内容继续
    TimedOut,
}

/// 翻页结果
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// 已翻到指定页
    Advanced(u32),
    Terminated(TerminationReason),
}

/// 分页控制器
///
/// 单个目标内的状态机：`AwaitingFirstLoad -> HasPage(n) -> Terminated`。
/// 每次翻页尝试的等待都有上限，被遮挡的按钮最多回退一次，
/// 因此一个目标的分页一定在有限步内结束。
pub struct PaginationController<'a, S: BrowserSession> {
    session: &'a S,
    profile: &'a SiteProfile,
    tuning: &'a CrawlTuning,
    obstructions: ObstructionHandler<'a>,
    phase: PaginationPhase,
    current_page_index: u32,
    known_max_page: Option<u32>,
}

impl<'a, S: BrowserSession> PaginationController<'a, S> {
    pub fn new(session: &'a S, profile: &'a SiteProfile, tuning: &'a CrawlTuning) -> Self {
        Self {
            session,
            profile,
            tuning,
            obstructions: ObstructionHandler::new(&profile.obstructions, tuning),
            phase: PaginationPhase::AwaitingFirstLoad,
            current_page_index: 0,
            known_max_page: None,
        }
    }

    pub fn phase(&self) -> &PaginationPhase {
        &self.phase
    }

    pub fn state(&self) -> PaginationState {
        PaginationState {
            current_page_index: self.current_page_index,
            known_max_page: self.known_max_page,
            terminated: matches!(self.phase, PaginationPhase::Terminated(_)),
        }
    }

    /// 等待第一页加载并尝试获取总页数
    ///
    /// 加载超时和页数获取失败都不是错误
    pub async fn start(&mut self) -> PageLoad {
        let load = self.wait_page_loaded().await;
        self.known_max_page = self.discover_page_count().await;
        self.current_page_index = 1;
        self.phase = PaginationPhase::HasPage(1);
        load
    }

    /// 在当前页抽取完成后调用，决定结束还是翻到下一页
    ///
    /// # 返回值
    ///
    /// 翻页成功返回新页码，否则返回结束原因。
    /// 按钮缺失、禁用或无法点击都是正常结束，不会返回错误。
    pub async fn advance(&mut self) -> AdvanceOutcome {
        let current = match &self.phase {
            PaginationPhase::HasPage(n) => *n,
            PaginationPhase::Terminated(reason) => {
                return AdvanceOutcome::Terminated(reason.clone())
            }
            PaginationPhase::AwaitingFirstLoad => {
                return self.terminate(TerminationReason::AdvanceFailed(
                    "pagination was not started".to_string(),
                ))
            }
        };

        if let Some(max) = self.known_max_page {
            if current >= max {
                return self.terminate(TerminationReason::MaxPageReached(max));
            }
        }
        if current >= self.tuning.max_pages_per_target {
            return self.terminate(TerminationReason::PageCapReached(
                self.tuning.max_pages_per_target,
            ));
        }

        self.obstructions.dismiss(self.session).await;

        let Some(control) = wait_for_selector(
            self.session,
            &self.profile.next_page.selector,
            self.tuning.next_control_timeout,
            self.tuning.poll_interval,
        )
        .await
        else {
            return self.terminate(TerminationReason::NextControlMissing);
        };

        // 按钮可能在重新渲染后脱离文档，读不到状态时按无法翻页处理
        match self.is_disabled(&control).await {
            Ok(true) => return self.terminate(TerminationReason::NextControlDisabled),
            Ok(false) => {}
            Err(e) => {
                return self.terminate(TerminationReason::AdvanceFailed(format!(
                    "could not read next-page control state: {}",
                    e
                )))
            }
        }

        tokio::time::sleep(self.tuning.pre_advance_delay).await;

        if let Err(reason) = self.click_next(&control).await {
            return self.terminate(TerminationReason::AdvanceFailed(reason));
        }

        let next = current + 1;
        self.current_page_index = next;
        self.phase = PaginationPhase::HasPage(next);
        debug!("Advanced to page {}", next);

        tokio::time::sleep(self.tuning.post_advance_settle).await;
        self.wait_page_loaded().await;

        AdvanceOutcome::Advanced(next)
    }

    /// 直接点击，被遮挡时滚动后强制点击一次
    async fn click_next(&self, control: &S::Element) -> Result<(), String> {
        match self.session.click(control).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_intercepted() => {
                warn!("Next-page click intercepted, retrying with script click");
                if let Err(e) = self.session.scroll_into_view(control).await {
                    debug!("Scroll into view failed: {}", e);
                }
                tokio::time::sleep(self.tuning.scroll_settle).await;
                self.session
                    .forced_click(control)
                    .await
                    .map_err(|e| format!("script click after interception failed: {}", e))
            }
            Err(e) => Err(e.to_string()),
        }
    }

    async fn is_disabled(&self, control: &S::Element) -> Result<bool, SessionError> {
        let Some(marker) = &self.profile.next_page.disabled else {
            return Ok(false);
        };
        let disabled = match marker {
            DisabledMarker::ClassContains(class) => self
                .session
                .attribute(control, "class")
                .await?
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)),
            DisabledMarker::AttributeEquals { name, value } => {
                self.session.attribute(control, name).await?.as_deref() == Some(value.as_str())
            }
            DisabledMarker::AttributePresent(name) => {
                self.session.attribute(control, name).await?.is_some()
            }
        };
        Ok(disabled)
    }

    async fn wait_page_loaded(&self) -> PageLoad {
        let found = wait_for_selector(
            self.session,
            &self.profile.page_loaded_marker,
            self.tuning.page_load_timeout,
            self.tuning.poll_interval,
        )
        .await;

        if found.is_some() {
            debug!("Page content loaded");
            PageLoad::Loaded
        } else {
            warn!(
                "Page content did not load within {:?}, continuing with what rendered",
                self.tuning.page_load_timeout
            );
            PageLoad::TimedOut
        }
    }

    async fn discover_page_count(&self) -> Option<u32> {
        let selector = self.profile.page_count_selector.as_deref()?;
        let Some(items) = wait_for_all(
            self.session,
            selector,
            self.tuning.page_count_timeout,
            self.tuning.poll_interval,
        )
        .await
        else {
            warn!("Page count unavailable, paginating until the next control runs out");
            return None;
        };

        let mut max_page = None;
        for item in &items {
            if let Ok(text) = self.session.text(item).await {
                max_page = max_page.max(parse_page_number(&text));
            }
        }
        match max_page {
            Some(n) => info!("Found {} pages", n),
            None => warn!("Page count items had no page numbers, paginating without a limit"),
        }
        max_page
    }

    fn terminate(&mut self, reason: TerminationReason) -> AdvanceOutcome {
        info!(
            "Pagination finished on page {}: {}",
            self.current_page_index, reason
        );
        self.phase = PaginationPhase::Terminated(reason.clone());
        AdvanceOutcome::Terminated(reason)
    }
}

/// 解析分页条中的页码，省略号等非纯数字项返回 `None`
fn parse_page_number(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().filter(|n| *n >= 1)
}
