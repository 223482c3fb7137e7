// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::config::settings::StorageSettings;
use crate::domain::models::record::Record;
use crate::domain::repositories::storage_repository::{RecordRepository, StorageError};

/// 内存存储实现
#[derive(Default)]
pub struct MemoryRecordRepository {
    records: Mutex<Vec<Record>>,
}

impl MemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl RecordRepository for MemoryRecordRepository {
    async fn save(&self, record: Record) -> Result<(), StorageError> {
        self.records.lock().push(record);
        Ok(())
    }

    async fn save_many(&self, records: Vec<Record>) -> Result<usize, StorageError> {
        let count = records.len();
        self.records.lock().extend(records);
        Ok(count)
    }

    async fn load(&self) -> Result<Vec<Record>, StorageError> {
        Ok(self.records.lock().clone())
    }
}

/// JSON Lines 文件存储实现
///
/// 每条记录一行JSON，追加写入
pub struct JsonLinesRecordRepository {
    path: PathBuf,
    /// 串行化写入，避免并发追加交错
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonLinesRecordRepository {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, records: &[Record]) -> Result<(), StorageError> {
        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl RecordRepository for JsonLinesRecordRepository {
    async fn save(&self, record: Record) -> Result<(), StorageError> {
        self.append(std::slice::from_ref(&record)).await
    }

    async fn save_many(&self, records: Vec<Record>) -> Result<usize, StorageError> {
        self.append(&records).await?;
        Ok(records.len())
    }

    async fn load(&self) -> Result<Vec<Record>, StorageError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).await?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StorageError::from))
            .collect()
    }
}

/// 根据配置创建存储协作方
///
/// # 参数
///
/// * `settings` - 存储配置
///
/// # 返回值
///
/// * `Ok(Arc<dyn RecordRepository>)` - 存储实现
/// * `Err(StorageError)` - 未知的存储类型或缺少路径
pub fn build_repository(
    settings: &StorageSettings,
) -> Result<Arc<dyn RecordRepository>, StorageError> {
    match settings.storage_type.as_str() {
        "memory" => {
            info!("Using in-memory record storage");
            Ok(Arc::new(MemoryRecordRepository::new()))
        }
        "json" | "jsonl" => {
            let path = settings.path.as_ref().ok_or_else(|| {
                StorageError::Other("storage.path is required for json storage".to_string())
            })?;
            info!("Using JSON lines record storage at {}", path);
            Ok(Arc::new(JsonLinesRecordRepository::new(path)))
        }
        other => Err(StorageError::Other(format!(
            "Unsupported storage type: {}",
            other
        ))),
    }
}
