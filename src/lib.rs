// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理浏览器、爬取节奏、输出和站点的配置
pub mod config;

/// 领域模块
///
/// 包含挂单模型、站点策略、输出接口和抽取引擎
pub mod domain;

/// 引擎模块
///
/// 浏览器会话能力及其 Chromium 实现
pub mod engines;

/// 基础设施模块
///
/// 表格输出和指标导出
pub mod infrastructure;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 每个站点一次完整运行的工作器
pub mod workers;
