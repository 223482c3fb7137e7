// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::stream::{self, Stream};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::use_cases::page_pipeline::PagePipeline;
use crate::domain::models::fetch_result::FetchResult;
use crate::domain::models::session_summary::{SessionSummary, SkipReason};
use crate::domain::services::extraction_service::NextLinkLocator;
use crate::engines::traits::FetchError;

/// 游走状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    Idle,
    FetchingPage,
    ExtractingLinks,
    Advancing,
    Done,
    Failed,
}

impl WalkState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WalkState::Done | WalkState::Failed)
    }
}

impl fmt::Display for WalkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WalkState::Idle => "idle",
            WalkState::FetchingPage => "fetching_page",
            WalkState::ExtractingLinks => "extracting_links",
            WalkState::Advancing => "advancing",
            WalkState::Done => "done",
            WalkState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 游走结果
#[derive(Debug)]
pub struct WalkOutcome {
    /// 按顺序抓取到的页面（失败时为已收集的部分结果）
    pub pages: Vec<FetchResult>,
    /// 终止状态
    pub state: WalkState,
    /// 游走摘要
    pub summary: SessionSummary,
    /// 种子URL本身的抓取错误
    pub seed_error: Option<FetchError>,
}

/// 分页游走器
///
/// 从种子URL出发，沿"下一页"链接逐页抓取。页面是惰性产出的：
/// 每次调用 `next_page()` 最多抓取一页。
///
/// 状态转换：Idle → FetchingPage → ExtractingLinks → Advancing → FetchingPage | Done，
/// 抓取出现不可恢复的错误时进入 Failed，已产出的页面不受影响。
pub struct PaginationWalker {
    pipeline: Arc<PagePipeline>,
    locator: Arc<NextLinkLocator>,
    /// 最大页数，0 表示不限制
    max_pages: u32,
    cancel: Option<watch::Receiver<bool>>,
    seed: String,
    state: WalkState,
    history: Vec<WalkState>,
    current_url: Option<String>,
    current_page: Option<FetchResult>,
    next_url: Option<String>,
    pages_fetched: u32,
    summary: SessionSummary,
    seed_error: Option<FetchError>,
}

impl PaginationWalker {
    pub fn new(
        pipeline: Arc<PagePipeline>,
        locator: Arc<NextLinkLocator>,
        seed: impl Into<String>,
        max_pages: u32,
    ) -> Self {
        Self {
            pipeline,
            locator,
            max_pages,
            cancel: None,
            seed: seed.into(),
            state: WalkState::Idle,
            history: vec![WalkState::Idle],
            current_url: None,
            current_page: None,
            next_url: None,
            pages_fetched: 0,
            summary: SessionSummary::new(),
            seed_error: None,
        }
    }

    /// 设置取消信号，收到后不再推进到下一页
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    /// 经历过的状态序列
    pub fn history(&self) -> &[WalkState] {
        &self.history
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    fn transition(&mut self, next: WalkState) {
        debug!("Walker {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn limit_reached(&self) -> bool {
        self.max_pages > 0 && self.pages_fetched >= self.max_pages
    }

    /// 在账本中认领URL，成功时作为下一个待抓取页面
    fn claim(&mut self, url: String) -> bool {
        match self.pipeline.ledger.try_claim(&url) {
            Ok(true) => {
                self.current_url = Some(url);
                true
            }
            Ok(false) => {
                info!("Stopping at already fetched page {}", url);
                self.summary.record_skipped(url, SkipReason::AlreadySeen);
                false
            }
            Err(e) => {
                warn!("Cannot claim {}: {}", url, e);
                self.summary.record_failed(url, e);
                false
            }
        }
    }

    fn on_idle(&mut self) {
        let seed = self.seed.clone();
        if self.is_cancelled() {
            self.summary.record_skipped(seed, SkipReason::Cancelled);
            self.transition(WalkState::Done);
            return;
        }
        match self.pipeline.ledger.try_claim(&seed) {
            Ok(true) => {
                self.current_url = Some(seed);
                self.transition(WalkState::FetchingPage);
            }
            Ok(false) => {
                info!("Seed {} already fetched within the cool-down window", seed);
                self.summary.record_skipped(seed, SkipReason::AlreadySeen);
                self.transition(WalkState::Done);
            }
            Err(e) => {
                let error = FetchError::InvalidRequest(e.to_string());
                self.summary.record_failed(seed, &error);
                self.seed_error = Some(error);
                self.transition(WalkState::Failed);
            }
        }
    }

    async fn on_fetching(&mut self) {
        let Some(url) = self.current_url.clone() else {
            self.transition(WalkState::Done);
            return;
        };
        if self.is_cancelled() {
            self.pipeline.ledger.release(&url);
            self.summary.record_skipped(url, SkipReason::Cancelled);
            self.current_url = None;
            self.transition(WalkState::Done);
            return;
        }

        match self.pipeline.fetch(&url).await {
            Ok(page) => {
                self.pages_fetched += 1;
                info!("Fetched page {} ({})", self.pages_fetched, url);
                self.summary.record_fetched(url);
                self.current_page = Some(page);
                self.transition(WalkState::ExtractingLinks);
            }
            Err(e) => {
                warn!("Pagination stopped at {}: {}", url, e);
                self.summary.record_failed(&url, &e);
                if self.pages_fetched == 0 {
                    self.seed_error = Some(e);
                }
                self.transition(WalkState::Failed);
            }
        }
    }

    async fn on_extracting(&mut self) {
        if let Some(page) = self.current_page.as_ref() {
            self.pipeline.harvest(page, &mut self.summary).await;
            self.next_url = self.locator.locate(page);
        }
        self.transition(WalkState::Advancing);
    }

    fn on_advancing(&mut self) -> Option<FetchResult> {
        let page = self.current_page.take();
        self.current_url = None;
        let next = self.next_url.take();

        let proceed = match next {
            None => {
                debug!("No next link, pagination complete");
                false
            }
            Some(url) if self.limit_reached() => {
                info!("Page limit {} reached", self.max_pages);
                self.summary.record_skipped(url, SkipReason::PageLimit);
                false
            }
            Some(url) if self.is_cancelled() => {
                self.summary.record_skipped(url, SkipReason::Cancelled);
                false
            }
            Some(url) => self.claim(url),
        };

        self.transition(if proceed {
            WalkState::FetchingPage
        } else {
            WalkState::Done
        });
        page
    }

    /// 抓取并返回下一页
    ///
    /// # 返回值
    ///
    /// * `Some(FetchResult)` - 下一页
    /// * `None` - 游走已结束（Done 或 Failed）
    pub async fn next_page(&mut self) -> Option<FetchResult> {
        loop {
            match self.state {
                WalkState::Idle => self.on_idle(),
                WalkState::FetchingPage => self.on_fetching().await,
                WalkState::ExtractingLinks => self.on_extracting().await,
                WalkState::Advancing => {
                    if let Some(page) = self.on_advancing() {
                        return Some(page);
                    }
                }
                WalkState::Done | WalkState::Failed => return None,
            }
        }
    }

    /// 转换为页面流
    pub fn into_stream(self) -> impl Stream<Item = FetchResult> {
        stream::unfold(self, |mut walker| async move {
            walker.next_page().await.map(|page| (page, walker))
        })
    }

    /// 游走到结束并收集所有页面
    pub async fn walk(mut self) -> WalkOutcome {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await {
            pages.push(page);
        }
        self.summary.finish();
        WalkOutcome {
            pages,
            state: self.state,
            summary: self.summary,
            seed_error: self.seed_error,
        }
    }
}
