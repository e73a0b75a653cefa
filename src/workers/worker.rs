// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::WorkerError;
use async_trait::async_trait;

/// Worker trait定义
///
/// 每个站点的一次完整运行由一个工作器完成
#[async_trait]
pub trait Worker: Send + Sync {
    /// 运行工作器，处理完所有目标后返回
    async fn run(&self) -> Result<(), WorkerError>;

    /// 获取工作器名称
    fn name(&self) -> &str;
}
