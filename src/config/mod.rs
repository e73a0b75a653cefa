// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理浏览器、爬取节奏、输出和站点的配置
pub mod settings;
