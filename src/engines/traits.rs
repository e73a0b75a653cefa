// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

/// 浏览器会话错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// 浏览器启动或连接失败
    #[error("Browser launch failed: {0}")]
    Launch(String),
    /// 页面导航失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 点击被其他元素遮挡
    #[error("Click intercepted by an overlapping element")]
    ClickIntercepted,
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 会话已关闭
    #[error("Session closed")]
    Closed,
    /// 协议层错误 (CDP 等)
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    /// 判断错误是否为点击遮挡
    ///
    /// 遮挡错误会触发滚动后强制点击的回退路径
    pub fn is_intercepted(&self) -> bool {
        matches!(self, SessionError::ClickIntercepted)
    }
}

/// 浏览器会话特质
///
/// 抽取引擎消费的渲染会话能力。一个会话对应一个活动页面，
/// 所有操作都作用于当前页面。
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// 元素句柄类型
    type Element: Send + Sync;

    /// 导航到指定URL
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// 查询所有匹配选择器的元素，按渲染顺序返回
    ///
    /// `within` 为 `Some` 时只在该元素内部查询
    async fn find_all(
        &self,
        selector: &str,
        within: Option<&Self::Element>,
    ) -> Result<Vec<Self::Element>, SessionError>;

    /// 查询第一个匹配选择器的元素
    async fn find_first(
        &self,
        selector: &str,
        within: Option<&Self::Element>,
    ) -> Result<Option<Self::Element>, SessionError> {
        Ok(self.find_all(selector, within).await?.into_iter().next())
    }

    /// 普通交互点击
    ///
    /// 元素被遮挡时返回 [`SessionError::ClickIntercepted`]
    async fn click(&self, element: &Self::Element) -> Result<(), SessionError>;

    /// 脚本级点击，绕过命中测试
    async fn forced_click(&self, element: &Self::Element) -> Result<(), SessionError>;

    /// 将元素滚动到可见区域
    async fn scroll_into_view(&self, element: &Self::Element) -> Result<(), SessionError>;

    /// 元素的可见文本
    async fn text(&self, element: &Self::Element) -> Result<String, SessionError>;

    /// 元素属性
    async fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    /// 关闭会话并释放浏览器进程
    async fn close(&self) -> Result<(), SessionError>;
}
