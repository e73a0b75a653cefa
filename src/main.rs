// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use p2pcrawl::config::settings::Settings;
use p2pcrawl::domain::models::site::SiteKind;
use p2pcrawl::engines::chromium_session::ChromiumSession;
use p2pcrawl::infrastructure::metrics::init_metrics;
use p2pcrawl::infrastructure::workbook::create_sink;
use p2pcrawl::utils::telemetry;
use p2pcrawl::workers::market_worker::MarketWorker;
use p2pcrawl::workers::Worker;
use tracing::{error, info, warn};

/// 主函数
///
/// 依次运行每个站点：启动浏览器、处理全部目标、关闭浏览器。
/// 命令行参数可以指定要运行的站点，缺省为配置中启用的站点。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging
    telemetry::init_telemetry(settings.logging.json);
    info!("Starting p2pcrawl...");

    if settings.metrics.enabled {
        init_metrics(&settings.metrics.listen_addr);
    }

    let requested = std::env::args()
        .skip(1)
        .map(|arg| arg.parse::<SiteKind>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(anyhow::Error::msg)?;
    let sites = if requested.is_empty() {
        settings.sites.enabled()
    } else {
        requested
    };

    // 3. Run each site with its own browser
    let mut failed_sites = Vec::new();
    for kind in sites {
        if let Err(e) = run_site(&settings, kind).await {
            error!("{} run did not complete cleanly: {}", kind, e);
            failed_sites.push(kind.to_string());
        }
    }

    if !failed_sites.is_empty() {
        anyhow::bail!("Failed sites: {}", failed_sites.join(", "));
    }
    info!("All sites processed");
    Ok(())
}

async fn run_site(settings: &Settings, kind: SiteKind) -> anyhow::Result<()> {
    let site = settings.sites.get(kind);
    let profile = site.profile(kind);
    let targets = profile.targets()?;
    let sink = create_sink(&settings.sink, &site.workbook)?;

    let session = ChromiumSession::launch(&settings.browser).await?;
    let worker = MarketWorker::new(session, sink, profile, settings.crawl.tuning(), targets);

    info!("Starting worker: {}", worker.name());
    let outcome = worker.run().await;

    if let Err(e) = worker.shutdown().await {
        warn!("Failed to close browser for {}: {}", kind, e);
    }
    outcome?;
    Ok(())
}
