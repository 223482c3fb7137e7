// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::models::fetch_request::{FetchRequest, RequestTemplate};
use crate::domain::models::fetch_result::FetchResult;
use crate::domain::models::session_summary::SessionSummary;
use crate::domain::services::dedup_ledger::DedupLedger;
use crate::domain::services::extraction_service::Extractor;
use crate::domain::services::result_emitter::ResultEmitter;
use crate::engines::fetch_executor::FetchExecutor;
use crate::engines::traits::FetchError;

/// 页面流水线
///
/// 分页游走器和工作者共用的协作方集合：抓取、提取、发射
pub struct PagePipeline {
    pub executor: Arc<FetchExecutor>,
    pub ledger: Arc<DedupLedger>,
    pub extractor: Arc<dyn Extractor>,
    pub emitter: Arc<ResultEmitter>,
    pub template: RequestTemplate,
}

impl PagePipeline {
    pub fn new(
        executor: Arc<FetchExecutor>,
        ledger: Arc<DedupLedger>,
        extractor: Arc<dyn Extractor>,
        emitter: Arc<ResultEmitter>,
        template: RequestTemplate,
    ) -> Self {
        Self {
            executor,
            ledger,
            extractor,
            emitter,
            template,
        }
    }

    /// 按模板为已认领的URL生成请求并抓取
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let request = self.template.request_for(url);
        self.execute(&request).await
    }

    /// 执行已认领的请求
    ///
    /// 失败时从账本中释放该URL，后续会话可以重新抓取
    pub async fn execute(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        match self.executor.execute(request).await {
            Ok(page) => Ok(page),
            Err(e) => {
                self.ledger.release(&request.url);
                Err(e)
            }
        }
    }

    /// 提取并发射页面中的记录
    ///
    /// 提取和存储错误只记入摘要，不向上传播
    pub async fn harvest(&self, page: &FetchResult, summary: &mut SessionSummary) {
        let records = match self.extractor.extract(page) {
            Ok(records) => records,
            Err(e) => {
                warn!("Extraction failed for {}: {}", page.final_url, e);
                summary.record_extraction_error(&page.final_url, e);
                return;
            }
        };

        match self.emitter.emit(records).await {
            Ok(count) => {
                debug!("{} records from {}", count, page.final_url);
                summary.record_emitted(count);
            }
            Err(e) => {
                warn!("Storing records from {} failed: {}", page.final_url, e);
                summary.record_storage_error(&page.final_url, e);
            }
        }
    }
}
