// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 抽取引擎的各个组成部分，全部面向 `BrowserSession` 特质编写：
/// - 抽取服务（extraction_service）：行抽取与页面抽取
/// - 遮挡物服务（obstruction_service）：关闭弹窗、横幅等遮挡物
/// - 分页服务（pagination_service）：翻页状态机与结束判定
/// - 爬取服务（crawl_service）：单个目标的抽取/翻页循环与故障隔离
pub mod crawl_service;
pub mod extraction_service;
pub mod obstruction_service;
pub mod pagination_service;
