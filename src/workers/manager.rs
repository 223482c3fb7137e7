// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::use_cases::page_pipeline::PagePipeline;
use crate::domain::models::fetch_request::FetchRequest;
use crate::domain::models::session_summary::{SessionSummary, SkipReason};
use crate::queue::url_queue::UrlQueue;
use crate::workers::fetch_worker::{FetchWorker, WorkerProgress};

/// 工作者句柄及其共享进度
struct WorkerSlot {
    handle: JoinHandle<()>,
    progress: Arc<Mutex<WorkerProgress>>,
}

/// 工作管理器
///
/// 批次摘要在创建时开始计时，入队失败和各工作者的结果都汇总到这里
pub struct WorkerManager<Q>
where
    Q: UrlQueue + 'static,
{
    queue: Arc<Q>,
    pipeline: Arc<PagePipeline>,
    cancel: watch::Receiver<bool>,
    workers: Vec<WorkerSlot>,
    summary: SessionSummary,
}

impl<Q> WorkerManager<Q>
where
    Q: UrlQueue + 'static,
{
    pub fn new(queue: Arc<Q>, pipeline: Arc<PagePipeline>, cancel: watch::Receiver<bool>) -> Self {
        Self {
            queue,
            pipeline,
            cancel,
            workers: Vec::new(),
            summary: SessionSummary::new(),
        }
    }

    /// 提交请求到队列，入队失败的URL记为失败
    pub async fn submit(&mut self, request: FetchRequest) {
        let url = request.url.clone();
        if let Err(e) = self.queue.enqueue(request).await {
            warn!("Failed to enqueue {}: {}", url, e);
            self.summary.record_failed(url, e);
        }
    }

    /// 启动工作进程
    ///
    /// # 参数
    ///
    /// * `count` - 要启动的工作进程数量（至少为 1）
    pub fn start_workers(&mut self, count: usize) {
        for worker_id in 0..count.max(1) {
            let worker = FetchWorker::new(worker_id, self.pipeline.clone(), self.cancel.clone());
            let queue = self.queue.clone();
            let progress = Arc::new(Mutex::new(WorkerProgress::default()));
            let shared = progress.clone();
            let handle = tokio::spawn(async move { worker.run(queue, shared).await });
            self.workers.push(WorkerSlot { handle, progress });
        }
        info!("Started {} fetch workers", self.workers.len());
    }

    /// 等待所有工作进程结束并合并摘要
    ///
    /// 异常退出的工作者保留已完成的结果，其正在处理的URL记为失败并从账本释放；
    /// 仍留在队列中的请求记为因取消而跳过
    pub async fn join(&mut self) -> SessionSummary {
        let mut summary = std::mem::take(&mut self.summary);
        for slot in self.workers.drain(..) {
            let joined = slot.handle.await;
            let progress = std::mem::take(&mut *slot.progress.lock());
            summary.merge(progress.summary);

            if let Err(e) = joined {
                error!("Fetch worker panicked: {}", e);
                if let Some(url) = progress.in_flight {
                    self.pipeline.ledger.release(&url);
                    summary.record_failed(url, format!("worker panicked: {}", e));
                }
            }
        }

        for request in self.queue.drain().await {
            summary.record_skipped(request.url, SkipReason::Cancelled);
        }

        summary.finish();
        summary
    }
}
