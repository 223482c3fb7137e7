// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod fixture_engine;

use galera::application::use_cases::page_pipeline::PagePipeline;
use galera::application::use_cases::scrape_session::ScrapeSession;
use galera::domain::models::fetch_request::RequestTemplate;
use galera::domain::models::identity::Identity;
use galera::domain::services::dedup_ledger::DedupLedger;
use galera::domain::services::extraction_service::{HtmlExtractor, NextLinkLocator};
use galera::domain::services::human_pacer::HumanPacer;
use galera::domain::services::identity_rotator::{IdentityRotator, RotationStrategy};
use galera::domain::services::result_emitter::ResultEmitter;
use galera::engines::fetch_executor::FetchExecutor;
use galera::engines::traits::FetchEngine;
use galera::infrastructure::storage::MemoryRecordRepository;
use galera::utils::retry_policy::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

/// 测试装置：会话及其可观察的协作方
pub struct Harness {
    pub session: ScrapeSession,
    pub rotator: Arc<IdentityRotator>,
    pub ledger: Arc<DedupLedger>,
    pub repository: Arc<MemoryRecordRepository>,
}

pub struct HarnessBuilder {
    engine: Arc<dyn FetchEngine>,
    pool_size: usize,
    max_pages: u32,
    retry_limit: u32,
    concurrency: usize,
    ledger: DedupLedger,
}

impl HarnessBuilder {
    pub fn new(engine: Arc<dyn FetchEngine>) -> Self {
        Self {
            engine,
            pool_size: 3,
            max_pages: 0,
            retry_limit: 3,
            concurrency: 4,
            ledger: DedupLedger::new(Some(Duration::from_secs(3600))),
        }
    }

    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn ledger(mut self, ledger: DedupLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn build(self) -> Harness {
        let pool = (0..self.pool_size)
            .map(|i| Identity::new(format!("GaleraTest/{}", i), None))
            .collect();
        let rotator = Arc::new(IdentityRotator::new(pool, RotationStrategy::RoundRobin));
        let executor = Arc::new(FetchExecutor::new(
            self.engine.clone(),
            rotator.clone(),
            Arc::new(HumanPacer::disabled()),
            RetryPolicy::immediate(),
        ));
        let ledger = Arc::new(self.ledger);
        let repository = Arc::new(MemoryRecordRepository::new());
        let template = RequestTemplate {
            retry_limit: self.retry_limit,
            timeout: Duration::from_secs(5),
            ..RequestTemplate::default()
        };
        let pipeline = PagePipeline::new(
            executor,
            ledger.clone(),
            Arc::new(HtmlExtractor::new()),
            Arc::new(ResultEmitter::new(repository.clone())),
            template,
        );
        let locator = NextLinkLocator::new(r#"a[rel="next"]"#).expect("valid selector");

        Harness {
            session: ScrapeSession::new(
                pipeline,
                self.engine,
                locator,
                self.max_pages,
                self.concurrency,
            ),
            rotator,
            ledger,
            repository,
        }
    }
}
