// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::config::settings::MetricsSettings;

/// 初始化指标系统
///
/// 启用时安装 Prometheus 导出器并注册抓取流水线的计数器
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        return;
    }

    let addr: SocketAddr = match settings.listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", settings.listen_addr, e);
            return;
        }
    };

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}", e);
        return;
    }

    describe_counter!(
        "galera_fetch_attempts_total",
        "Total number of fetch attempts, labelled by engine"
    );
    describe_counter!(
        "galera_identity_rotations_total",
        "Identity rotations triggered by blocked responses"
    );
    describe_counter!(
        "galera_fetch_failures_total",
        "Terminal fetch failures, labelled by error kind"
    );
    describe_counter!(
        "galera_pages_fetched_total",
        "Pages fetched successfully"
    );
    describe_counter!(
        "galera_records_emitted_total",
        "Records handed to the storage collaborator"
    );

    info!("Metrics exporter listening on {}", addr);
}
