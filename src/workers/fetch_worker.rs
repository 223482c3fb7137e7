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

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::application::use_cases::page_pipeline::PagePipeline;
use crate::domain::models::fetch_request::FetchRequest;
use crate::domain::models::session_summary::{SessionSummary, SkipReason};
use crate::queue::url_queue::UrlQueue;

/// 工作者进度
///
/// 每处理完一个URL就合并进来，工作者异常退出后管理器仍能读到已完成的部分
#[derive(Debug, Default)]
pub struct WorkerProgress {
    /// 已完成URL的摘要
    pub summary: SessionSummary,
    /// 正在处理的URL
    pub in_flight: Option<String>,
}

/// 抓取工作者
///
/// 从共享队列拉取请求，认领、抓取、提取并发射记录，直到队列为空或收到取消信号
pub struct FetchWorker {
    worker_id: usize,
    pipeline: Arc<PagePipeline>,
    cancel: watch::Receiver<bool>,
}

impl FetchWorker {
    pub fn new(worker_id: usize, pipeline: Arc<PagePipeline>, cancel: watch::Receiver<bool>) -> Self {
        Self {
            worker_id,
            pipeline,
            cancel,
        }
    }

    /// 运行工作者，结果写入共享进度
    pub async fn run<Q>(&self, queue: Arc<Q>, progress: Arc<Mutex<WorkerProgress>>)
    where
        Q: UrlQueue + ?Sized,
    {
        info!("Fetch worker {} started", self.worker_id);

        loop {
            if *self.cancel.borrow() {
                info!("Fetch worker {} cancelled", self.worker_id);
                break;
            }

            match queue.dequeue().await {
                Ok(Some(request)) => {
                    progress.lock().in_flight = Some(request.url.clone());
                    let mut outcome = SessionSummary::default();
                    self.process(request, &mut outcome).await;

                    let mut shared = progress.lock();
                    shared.summary.merge(outcome);
                    shared.in_flight = None;
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Worker {} failed to dequeue: {}", self.worker_id, e);
                    break;
                }
            }
        }

        let progress = progress.lock();
        info!(
            "Fetch worker {} finished: {} fetched, {} failed",
            self.worker_id,
            progress.summary.fetched.len(),
            progress.summary.failed.len()
        );
    }

    #[instrument(skip(self, request, summary), fields(worker = self.worker_id, url = %request.url))]
    async fn process(&self, request: FetchRequest, summary: &mut SessionSummary) {
        match self.pipeline.ledger.try_claim(&request.url) {
            Ok(true) => {}
            Ok(false) => {
                summary.record_skipped(request.url, SkipReason::AlreadySeen);
                return;
            }
            Err(e) => {
                warn!("Rejecting URL: {}", e);
                summary.record_failed(request.url, e);
                return;
            }
        }

        match self.pipeline.execute(&request).await {
            Ok(page) => {
                summary.record_fetched(&request.url);
                self.pipeline.harvest(&page, summary).await;
            }
            Err(e) => {
                warn!("Fetch failed: {}", e);
                summary.record_failed(request.url, e);
            }
        }
    }
}
