// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::site::ObstructionSpec;
use crate::domain::models::tuning::CrawlTuning;
use crate::engines::traits::{BrowserSession, SessionError};
use crate::engines::wait::wait_until;
use tracing::{debug, info};

/// 遮挡物处理器
///
/// 尽力关闭已知的遮挡物 (Cookie横幅、推广弹窗、确认对话框)。
/// 任何失败都只记录日志，调用方可以在任意交互前放心调用。
pub struct ObstructionHandler<'a> {
    specs: &'a [ObstructionSpec],
    tuning: &'a CrawlTuning,
}

impl<'a> ObstructionHandler<'a> {
    pub fn new(specs: &'a [ObstructionSpec], tuning: &'a CrawlTuning) -> Self {
        Self { specs, tuning }
    }

    /// 依次尝试关闭每种遮挡物
    ///
    /// # 返回值
    ///
    /// 成功关闭的遮挡物数量
    pub async fn dismiss<S: BrowserSession>(&self, session: &S) -> usize {
        let mut dismissed = 0;
        for spec in self.specs {
            let Some(control) = self.locate(session, spec).await else {
                debug!("No {} present", spec.kind);
                continue;
            };

            match self.press(session, &control).await {
                Ok(()) => {
                    info!("Dismissed {}", spec.kind);
                    dismissed += 1;
                }
                Err(e) => debug!("Could not dismiss {}: {}", spec.kind, e),
            }
        }
        dismissed
    }

    async fn locate<S: BrowserSession>(
        &self,
        session: &S,
        spec: &ObstructionSpec,
    ) -> Option<S::Element> {
        wait_until(
            self.tuning.obstruction_wait,
            self.tuning.poll_interval,
            move || async move {
                let candidates = session.find_all(&spec.selector, None).await.ok()?;
                let Some(expected) = spec.text.as_deref() else {
                    return candidates.into_iter().next();
                };
                for candidate in candidates {
                    if matches!(session.text(&candidate).await, Ok(t) if t.trim() == expected) {
                        return Some(candidate);
                    }
                }
                None
            },
        )
        .await
    }

    async fn press<S: BrowserSession>(
        &self,
        session: &S,
        control: &S::Element,
    ) -> Result<(), SessionError> {
        match session.click(control).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("Direct click failed ({}), using script click", e);
                session.forced_click(control).await
            }
        }
    }
}
