// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{bail, Context};
use galera::application::use_cases::scrape_session::ScrapeSession;
use galera::config::settings::Settings;
use galera::infrastructure::metrics::init_metrics;
use galera::infrastructure::storage::build_repository;
use galera::utils::telemetry;
use tokio::signal;
use tracing::{error, info};

/// 主函数
///
/// 一个种子URL时沿分页链抓取，多个URL时交给工作者池并行抓取，
/// 结束后把会话摘要以JSON打印到标准输出
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new().context("failed to load configuration")?;

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(&settings.logging);
    init_metrics(&settings.metrics);
    info!("Starting galera...");

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        bail!("usage: galera <seed-url> | galera <url> <url>...");
    }

    // 3. Assemble the session
    let repository = build_repository(&settings.storage)?;
    let session = ScrapeSession::from_settings(&settings, repository).await?;

    let handle = session.handle();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                handle.cancel();
            }
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
    });

    // 4. Run
    let result = if urls.len() == 1 {
        session
            .paginate(&urls[0])
            .await
            .map(|outcome| outcome.summary)
    } else {
        Ok(session.scrape_many(urls).await)
    };

    // 5. Persist state and release the browser even when the seed failed
    if let Some(path) = &settings.storage.ledger_path {
        session.persist_ledger(path).await?;
    }
    session.shutdown().await;

    let summary = result?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    info!("Session {} finished", summary.session_id);
    Ok(())
}
