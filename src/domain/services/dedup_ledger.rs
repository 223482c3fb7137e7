// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::utils::url_utils::{fingerprint, normalize_url};

/// 去重账本错误
#[derive(Error, Debug)]
pub enum LedgerError {
    /// URL无法解析
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 账本条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupEntry {
    /// 规范化后的URL
    pub url: String,
    /// 抓取时间
    pub fetched_at: DateTime<Utc>,
}

/// 去重账本
///
/// 以规范化URL的指纹为键记录抓取时间。冷却窗口（TTL）内的URL视为已抓取，
/// 超过TTL的条目可以重新抓取。`try_claim` 把"检查-标记"合并为一次原子操作，
/// 保证同一URL不会被两个工作者同时抓取。
#[derive(Debug)]
pub struct DedupLedger {
    entries: DashMap<String, DedupEntry>,
    /// None 表示会话内永不过期
    ttl: Option<chrono::Duration>,
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DedupLedger {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: ttl.and_then(|d| chrono::Duration::from_std(d).ok()),
        }
    }

    fn key_for(url: &str) -> Result<(String, String), LedgerError> {
        let normalized = normalize_url(url).map_err(|source| LedgerError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok((fingerprint(&normalized), normalized))
    }

    fn is_fresh(&self, entry: &DedupEntry, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now - entry.fetched_at < ttl,
            None => true,
        }
    }

    /// URL是否在冷却窗口内已被抓取
    ///
    /// 无法解析的URL视为未见过
    pub fn seen(&self, url: &str) -> bool {
        let Ok((key, _)) = Self::key_for(url) else {
            return false;
        };
        let now = Utc::now();
        self.entries
            .get(&key)
            .map(|entry| self.is_fresh(&entry, now))
            .unwrap_or(false)
    }

    /// 标记URL为已抓取
    pub fn mark(&self, url: &str) -> Result<(), LedgerError> {
        self.mark_at(url, Utc::now())
    }

    /// 以指定时间标记URL
    pub fn mark_at(&self, url: &str, fetched_at: DateTime<Utc>) -> Result<(), LedgerError> {
        let (key, normalized) = Self::key_for(url)?;
        self.entries.insert(
            key,
            DedupEntry {
                url: normalized,
                fetched_at,
            },
        );
        Ok(())
    }

    /// 原子地检查并标记URL
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - URL未见过（或已过冷却期），现在归调用方所有
    /// * `Ok(false)` - URL在冷却窗口内已被抓取或正在被抓取
    pub fn try_claim(&self, url: &str) -> Result<bool, LedgerError> {
        let (key, normalized) = Self::key_for(url)?;
        let now = Utc::now();

        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if self.is_fresh(occupied.get(), now) {
                    debug!("Ledger hit for {}", normalized);
                    return Ok(false);
                }
                occupied.insert(DedupEntry {
                    url: normalized,
                    fetched_at: now,
                });
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(DedupEntry {
                    url: normalized,
                    fetched_at: now,
                });
                Ok(true)
            }
        }
    }

    /// 释放URL，使其可以在后续会话中重新抓取（用于抓取失败的URL）
    pub fn release(&self, url: &str) {
        if let Ok((key, _)) = Self::key_for(url) {
            self.entries.remove(&key);
        }
    }

    /// 清除过期条目，返回清除的数量
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| self.is_fresh(entry, now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有条目的快照
    pub fn snapshot(&self) -> Vec<DedupEntry> {
        let mut entries: Vec<DedupEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.url.cmp(&b.url));
        entries
    }

    /// 将账本持久化为JSON文件
    pub async fn persist(&self, path: impl AsRef<Path>) -> Result<(), LedgerError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let data = serde_json::to_vec_pretty(&self.snapshot())?;
        tokio::fs::write(path, data).await?;
        info!("Ledger persisted: {} entries to {}", self.len(), path.display());
        Ok(())
    }

    /// 从JSON文件加载账本，文件不存在时返回空账本；已过期的条目不会载入
    pub async fn load(path: impl AsRef<Path>, ttl: Option<Duration>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let ledger = Self::new(ttl);
        if !tokio::fs::try_exists(path).await? {
            return Ok(ledger);
        }

        let data = tokio::fs::read(path).await?;
        let entries: Vec<DedupEntry> = serde_json::from_slice(&data)?;
        for entry in entries {
            ledger.mark_at(&entry.url, entry.fetched_at)?;
        }
        let purged = ledger.purge_expired();
        info!(
            "Ledger loaded: {} entries from {} ({} expired)",
            ledger.len(),
            path.display(),
            purged
        );
        Ok(ledger)
    }
}
