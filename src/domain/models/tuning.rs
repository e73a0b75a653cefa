// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

/// 抽取引擎的等待与重试参数
///
/// 所有超时、等待和上限都集中在这里，在构造引擎时传入
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlTuning {
    /// 等待列表行渲染完成的超时，超时不视为错误
    pub page_load_timeout: Duration,
    /// 等待页码元素的超时
    pub page_count_timeout: Duration,
    /// 等待下一页按钮出现的超时
    pub next_control_timeout: Duration,
    /// 每种遮挡物的等待时间
    pub obstruction_wait: Duration,
    /// 轮询间隔
    pub poll_interval: Duration,
    /// 点击下一页前的等待
    pub pre_advance_delay: Duration,
    /// 滚动后、强制点击前的等待
    pub scroll_settle: Duration,
    /// 翻页成功后、等待加载标记前的等待
    pub post_advance_settle: Duration,
    /// 两个目标之间的等待
    pub inter_target_delay: Duration,
    /// 单个目标最多访问的页数
    pub max_pages_per_target: u32,
}

impl Default for CrawlTuning {
    fn default() -> Self {
        Self {
            page_load_timeout: Duration::from_secs(5),
            page_count_timeout: Duration::from_secs(5),
            next_control_timeout: Duration::from_secs(5),
            obstruction_wait: Duration::from_secs(2),
            poll_interval: Duration::from_millis(250),
            pre_advance_delay: Duration::from_secs(1),
            scroll_settle: Duration::from_millis(500),
            post_advance_settle: Duration::from_millis(500),
            inter_target_delay: Duration::from_secs(2),
            max_pages_per_target: 200,
        }
    }
}
