// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::counter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::record::Record;
use crate::domain::repositories::storage_repository::{RecordRepository, StorageError};

/// 结果发射器
///
/// 把提取出的记录交给存储协作方，并统计已发射的记录数
pub struct ResultEmitter {
    repository: Arc<dyn RecordRepository>,
    emitted: AtomicUsize,
}

impl ResultEmitter {
    pub fn new(repository: Arc<dyn RecordRepository>) -> Self {
        Self {
            repository,
            emitted: AtomicUsize::new(0),
        }
    }

    /// 发射一批记录
    ///
    /// # 返回值
    ///
    /// * `Ok(usize)` - 存储接受的记录数
    /// * `Err(StorageError)` - 存储失败，调用方负责记入会话摘要
    pub async fn emit(&self, records: Vec<Record>) -> Result<usize, StorageError> {
        if records.is_empty() {
            return Ok(0);
        }
        let saved = self.repository.save_many(records).await?;
        self.emitted.fetch_add(saved, Ordering::Relaxed);
        counter!("galera_records_emitted_total").increment(saved as u64);
        debug!("Emitted {} records", saved);
        Ok(saved)
    }

    /// 累计发射的记录数
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn repository(&self) -> Arc<dyn RecordRepository> {
        self.repository.clone()
    }
}
