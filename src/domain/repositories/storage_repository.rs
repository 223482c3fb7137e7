// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::record::Record;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// 存储错误
    #[error("Storage error: {0}")]
    Other(String),
}

/// 记录仓库特质
///
/// 存储协作方的最小写入契约，以及分析路径使用的读取接口
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// 保存单条记录
    async fn save(&self, record: Record) -> Result<(), StorageError>;

    /// 批量保存记录，返回保存的数量
    async fn save_many(&self, records: Vec<Record>) -> Result<usize, StorageError> {
        let count = records.len();
        for record in records {
            self.save(record).await?;
        }
        Ok(count)
    }

    /// 读取所有记录
    async fn load(&self) -> Result<Vec<Record>, StorageError>;
}

#[async_trait]
impl<T: RecordRepository + ?Sized> RecordRepository for std::sync::Arc<T> {
    async fn save(&self, record: Record) -> Result<(), StorageError> {
        (**self).save(record).await
    }

    async fn save_many(&self, records: Vec<Record>) -> Result<usize, StorageError> {
        (**self).save_many(records).await
    }

    async fn load(&self) -> Result<Vec<Record>, StorageError> {
        (**self).load().await
    }
}
