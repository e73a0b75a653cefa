// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::sheet_repository::SinkError;
use crate::engines::traits::SessionError;
use thiserror::Error;

/// 单个目标的失败原因
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("导航失败: {0}")]
    Navigation(#[source] SessionError),

    /// 第一页都没有抽取到，保留上一次的输出
    #[error("爬取失败: {0}")]
    Crawl(String),

    #[error("写入失败: {0}")]
    Sink(#[from] SinkError),
}

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("输出错误: {0}")]
    Sink(String),

    #[error("{0} 个目标失败")]
    TargetsFailed(usize),
}
