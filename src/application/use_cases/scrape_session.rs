// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

use crate::application::use_cases::page_pipeline::PagePipeline;
use crate::application::use_cases::pagination_walker::{PaginationWalker, WalkOutcome, WalkState};
use crate::config::settings::Settings;
use crate::domain::models::fetch_request::RequestTemplate;
use crate::domain::models::session_summary::SessionSummary;
use crate::domain::repositories::storage_repository::RecordRepository;
use crate::domain::services::dedup_ledger::{DedupLedger, LedgerError};
use crate::domain::services::extraction_service::{ExtractionError, HtmlExtractor, NextLinkLocator};
use crate::domain::services::human_pacer::HumanPacer;
use crate::domain::services::identity_rotator::IdentityRotator;
use crate::domain::services::result_emitter::ResultEmitter;
use crate::engines::engine_factory::build_engine;
use crate::engines::fetch_executor::FetchExecutor;
use crate::engines::traits::{FetchEngine, FetchError};
use crate::queue::url_queue::InMemoryUrlQueue;
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::manager::WorkerManager;

/// 会话错误类型
#[derive(Error, Debug)]
pub enum SessionError {
    /// 种子URL无法抓取
    #[error("Seed URL {url} could not be fetched: {source}")]
    SeedFailed {
        url: String,
        #[source]
        source: FetchError,
    },
    /// 引擎配置错误
    #[error("Engine error: {0}")]
    Engine(#[from] FetchError),
    /// 选择器配置错误
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    /// 账本错误
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// 会话句柄
///
/// 可在其他任务中取消会话：停止发出新的抓取，进行中的抓取自然结束或超时
#[derive(Clone)]
pub struct SessionHandle {
    cancel: Arc<watch::Sender<bool>>,
}

impl SessionHandle {
    pub fn cancel(&self) {
        info!("Cancelling scrape session");
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

/// 抓取会话
///
/// 把配置装配为各个协作方，负责分页游走、URL列表的并行抓取和取消
pub struct ScrapeSession {
    pipeline: Arc<PagePipeline>,
    engine: Arc<dyn FetchEngine>,
    locator: Arc<NextLinkLocator>,
    max_pages: u32,
    concurrency: usize,
    cancel: Arc<watch::Sender<bool>>,
}

impl ScrapeSession {
    pub fn new(
        pipeline: PagePipeline,
        engine: Arc<dyn FetchEngine>,
        locator: NextLinkLocator,
        max_pages: u32,
        concurrency: usize,
    ) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            pipeline: Arc::new(pipeline),
            engine,
            locator: Arc::new(locator),
            max_pages,
            concurrency: concurrency.max(1),
            cancel: Arc::new(cancel),
        }
    }

    /// 根据配置装配会话
    ///
    /// # 参数
    ///
    /// * `settings` - 应用配置
    /// * `repository` - 存储协作方
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapeSession)` - 装配好的会话；配置了 `ledger_path` 时从文件恢复账本
    /// * `Err(SessionError)` - 引擎、选择器或账本配置错误
    pub async fn from_settings(
        settings: &Settings,
        repository: Arc<dyn RecordRepository>,
    ) -> Result<Self, SessionError> {
        let scraping = &settings.scraping;
        let engine = build_engine(scraping, &settings.browser)?;
        let rotator = Arc::new(IdentityRotator::from_settings(
            &settings.identity,
            scraping.use_proxies,
        ));
        let pacer = Arc::new(HumanPacer::from_settings(
            &settings.pacing,
            scraping.simulate_human,
        ));
        let executor = Arc::new(FetchExecutor::new(
            engine.clone(),
            rotator,
            pacer,
            RetryPolicy::from(&settings.backoff),
        ));

        let ledger = match &settings.storage.ledger_path {
            Some(path) => DedupLedger::load(path, scraping.dedup_ttl()).await?,
            None => DedupLedger::new(scraping.dedup_ttl()),
        };

        let template = RequestTemplate {
            mode: scraping.mode,
            retry_limit: scraping.retry_limit,
            timeout: scraping.timeout(),
            headers: scraping.headers.clone(),
        };
        let pipeline = PagePipeline::new(
            executor,
            Arc::new(ledger),
            Arc::new(HtmlExtractor::new()),
            Arc::new(ResultEmitter::new(repository)),
            template,
        );
        let locator = NextLinkLocator::new(&settings.pagination.next_selector)?;

        Ok(Self::new(
            pipeline,
            engine,
            locator,
            scraping.max_pages,
            scraping.concurrency,
        ))
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            cancel: self.cancel.clone(),
        }
    }

    pub fn ledger(&self) -> Arc<DedupLedger> {
        self.pipeline.ledger.clone()
    }

    pub fn pipeline(&self) -> Arc<PagePipeline> {
        self.pipeline.clone()
    }

    /// 为种子URL创建分页游走器
    pub fn walker(&self, seed: impl Into<String>) -> PaginationWalker {
        PaginationWalker::new(
            self.pipeline.clone(),
            self.locator.clone(),
            seed,
            self.max_pages,
        )
        .with_cancellation(self.cancel.subscribe())
    }

    /// 沿分页链抓取
    ///
    /// # 返回值
    ///
    /// * `Ok(WalkOutcome)` - 游走结果，中途失败时包含已抓取的部分页面
    /// * `Err(SessionError::SeedFailed)` - 种子URL本身无法抓取
    pub async fn paginate(&self, seed: &str) -> Result<WalkOutcome, SessionError> {
        info!("Paginating from {}", seed);
        let mut outcome = self.walker(seed).walk().await;

        if outcome.state == WalkState::Failed && outcome.pages.is_empty() {
            if let Some(source) = outcome.seed_error.take() {
                return Err(SessionError::SeedFailed {
                    url: seed.to_string(),
                    source,
                });
            }
        }

        info!(
            "Pagination finished in state {}: {} pages, {} records",
            outcome.state,
            outcome.pages.len(),
            outcome.summary.records_emitted
        );
        Ok(outcome)
    }

    /// 使用工作者池并行抓取URL列表
    ///
    /// 单个URL的失败不会中止会话，所有结果记入摘要
    pub async fn scrape_many(&self, urls: Vec<String>) -> SessionSummary {
        let mut urls = urls;
        self.pipeline.executor.pacer().shuffle(&mut urls);

        let queue = Arc::new(InMemoryUrlQueue::new());
        let mut manager =
            WorkerManager::new(queue.clone(), self.pipeline.clone(), self.cancel.subscribe());
        for url in urls {
            manager.submit(self.pipeline.template.request_for(url)).await;
        }
        queue.close();

        manager.start_workers(self.concurrency);
        let summary = manager.join().await;

        info!(
            "Batch finished: {} fetched, {} skipped, {} failed, {} records",
            summary.fetched.len(),
            summary.skipped.len(),
            summary.failed.len(),
            summary.records_emitted
        );
        summary
    }

    /// 持久化账本
    pub async fn persist_ledger(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        self.pipeline.ledger.persist(path).await?;
        Ok(())
    }

    /// 释放引擎资源
    pub async fn shutdown(&self) {
        self.engine.shutdown().await;
    }
}
