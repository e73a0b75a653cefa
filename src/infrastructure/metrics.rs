// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 启动 Prometheus 导出器并注册指标说明
///
/// 地址无效或端口被占用时只记录警告，爬取照常进行
pub fn init_metrics(listen_addr: &str) {
    let addr: SocketAddr = match listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", listen_addr, e);
            return;
        }
    };

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!("p2p_pages_visited_total", "Listing pages extracted");
    describe_counter!(
        "p2p_records_extracted_total",
        "Listing records extracted from rows"
    );
    describe_counter!(
        "p2p_rows_dropped_total",
        "Rendered rows that produced no usable field"
    );
    describe_counter!(
        "p2p_targets_completed_total",
        "Targets whose records reached the sink"
    );
    describe_counter!(
        "p2p_targets_failed_total",
        "Targets that failed navigation or sink writes"
    );
    describe_histogram!(
        "p2p_target_crawl_seconds",
        "Time spent paginating one target in seconds"
    );
}
