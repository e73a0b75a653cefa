// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::BrowserSession;
use std::future::Future;
use std::time::Duration;

/// 最小轮询间隔
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 轮询等待，直到探测函数返回 `Some` 或超时
///
/// # 参数
///
/// * `timeout` - 最长等待时间
/// * `poll` - 两次探测之间的间隔
/// * `probe` - 探测函数
///
/// # 返回值
///
/// 超时返回 `None`
pub async fn wait_until<T, F, Fut>(timeout: Duration, poll: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let poll = poll.max(MIN_POLL_INTERVAL);
    tokio::time::timeout(timeout, async {
        loop {
            if let Some(value) = probe().await {
                return value;
            }
            tokio::time::sleep(poll).await;
        }
    })
    .await
    .ok()
}

/// 等待选择器对应的元素出现
///
/// 查询过程中的会话错误视为"尚未出现"，继续轮询直到超时
pub async fn wait_for_selector<S: BrowserSession>(
    session: &S,
    selector: &str,
    timeout: Duration,
    poll: Duration,
) -> Option<S::Element> {
    wait_until(timeout, poll, move || async move {
        match session.find_first(selector, None).await {
            Ok(found) => found,
            Err(e) => {
                tracing::trace!("Polling {} failed: {}", selector, e);
                None
            }
        }
    })
    .await
}

/// 等待选择器至少匹配一个元素，返回全部匹配
pub async fn wait_for_all<S: BrowserSession>(
    session: &S,
    selector: &str,
    timeout: Duration,
    poll: Duration,
) -> Option<Vec<S::Element>> {
    wait_until(timeout, poll, move || async move {
        match session.find_all(selector, None).await {
            Ok(found) if !found.is_empty() => Some(found),
            _ => None,
        }
    })
    .await
}
