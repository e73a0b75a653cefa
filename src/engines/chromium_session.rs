// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BrowserSettings;
use crate::engines::traits::{BrowserSession, SessionError};
use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

// Returns true when the element centre is not covered by another element.
const HIT_TEST_FN: &str = r#"function() {
    this.scrollIntoView({ block: 'center', inline: 'center' });
    const r = this.getBoundingClientRect();
    const top = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2);
    return top === null || top === this || this.contains(top);
}"#;

const FORCED_CLICK_FN: &str = "function() { this.click(); }";

impl From<CdpError> for SessionError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::Timeout => SessionError::Timeout,
            other => SessionError::Protocol(other.to_string()),
        }
    }
}

/// Chromium 浏览器会话
///
/// 基于chromiumoxide实现，一个会话持有一个浏览器进程和一个活动页面
pub struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
    remote: bool,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    /// 启动或连接浏览器并打开一个空白页面
    ///
    /// # 参数
    ///
    /// * `settings` - 浏览器配置
    ///
    /// # 返回值
    ///
    /// * `Ok(ChromiumSession)` - 可用的会话
    /// * `Err(SessionError)` - 启动或连接失败
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, SessionError> {
        let remote_debugging_url = settings
            .remote_debugging_url
            .clone()
            .or_else(|| std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL").ok());

        let (browser, mut handler) = if let Some(ref url) = remote_debugging_url {
            tracing::info!("Connecting to remote Chrome instance at: {}", url);
            Browser::connect(url).await.map_err(|e| {
                SessionError::Launch(format!("Failed to connect to remote Chrome: {}", e))
            })?
        } else {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(Duration::from_secs(settings.request_timeout_secs));

            if !settings.headless {
                builder = builder.with_head();
            }
            if let Some(ref path) = settings.chrome_executable {
                builder = builder.chrome_executable(path);
            }

            // Production environment setup
            builder = builder.arg("--disable-gpu").arg("--disable-dev-shm-usage");

            let config = builder.build().map_err(SessionError::Launch)?;
            Browser::launch(config)
                .await
                .map_err(|e| SessionError::Launch(e.to_string()))?
        };

        // Spawn a handler to process browser events
        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(SessionError::Launch(format!("Failed to open page: {}", e)));
            }
        };

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler,
            remote: remote_debugging_url.is_some(),
            navigation_timeout: Duration::from_secs(settings.navigation_timeout_secs),
        })
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(SessionError::Navigation(e.to_string())),
            Err(_) => Err(SessionError::Navigation(format!(
                "navigation to {} timed out after {:?}",
                url, self.navigation_timeout
            ))),
        }
    }

    async fn find_all(
        &self,
        selector: &str,
        within: Option<&Element>,
    ) -> Result<Vec<Element>, SessionError> {
        let found = match within {
            Some(element) => element.find_elements(selector).await?,
            None => self.page.find_elements(selector).await?,
        };
        Ok(found)
    }

    async fn click(&self, element: &Element) -> Result<(), SessionError> {
        let hit = element.call_js_fn(HIT_TEST_FN, false).await?;
        let reachable = hit
            .result
            .value
            .as_ref()
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        if !reachable {
            return Err(SessionError::ClickIntercepted);
        }
        element.click().await?;
        Ok(())
    }

    async fn forced_click(&self, element: &Element) -> Result<(), SessionError> {
        element.call_js_fn(FORCED_CLICK_FN, false).await?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &Element) -> Result<(), SessionError> {
        element.scroll_into_view().await?;
        Ok(())
    }

    async fn text(&self, element: &Element) -> Result<String, SessionError> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, SessionError> {
        Ok(element.attribute(name).await?)
    }

    async fn close(&self) -> Result<(), SessionError> {
        let mut guard = self.browser.lock().await;
        let Some(mut browser) = guard.take() else {
            return Ok(());
        };

        // A remote browser is shared; only detach from it.
        let result = if self.remote {
            Ok(())
        } else {
            let closed = browser.close().await.map(|_| ()).map_err(SessionError::from);
            if let Err(e) = browser.wait().await {
                tracing::warn!("Waiting for the browser process failed: {}", e);
            }
            closed
        };

        self.handler.abort();
        result
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
