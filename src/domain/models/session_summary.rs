// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// 冷却窗口内已抓取
    AlreadySeen,
    /// 会话已取消
    Cancelled,
    /// 达到分页上限
    PageLimit,
}

/// 被跳过的URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedUrl {
    pub url: String,
    pub reason: SkipReason,
}

/// 失败的URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedUrl {
    pub url: String,
    pub error: String,
}

/// 会话摘要
///
/// 记录一次抓取会话中所有已抓取、被跳过和失败的URL，保证没有静默丢失
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// 会话ID
    pub session_id: Uuid,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 结束时间
    pub finished_at: Option<DateTime<Utc>>,
    /// 成功抓取的URL
    pub fetched: Vec<String>,
    /// 被跳过的URL
    pub skipped: Vec<SkippedUrl>,
    /// 抓取失败的URL
    pub failed: Vec<FailedUrl>,
    /// 提取失败的页面
    pub extraction_errors: Vec<FailedUrl>,
    /// 存储失败的页面
    pub storage_errors: Vec<FailedUrl>,
    /// 已发射的记录数
    pub records_emitted: usize,
}

impl Default for SessionSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSummary {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            fetched: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            extraction_errors: Vec::new(),
            storage_errors: Vec::new(),
            records_emitted: 0,
        }
    }

    pub fn record_fetched(&mut self, url: impl Into<String>) {
        self.fetched.push(url.into());
    }

    pub fn record_skipped(&mut self, url: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedUrl {
            url: url.into(),
            reason,
        });
    }

    pub fn record_failed(&mut self, url: impl Into<String>, error: impl ToString) {
        self.failed.push(FailedUrl {
            url: url.into(),
            error: error.to_string(),
        });
    }

    pub fn record_extraction_error(&mut self, url: impl Into<String>, error: impl ToString) {
        self.extraction_errors.push(FailedUrl {
            url: url.into(),
            error: error.to_string(),
        });
    }

    pub fn record_storage_error(&mut self, url: impl Into<String>, error: impl ToString) {
        self.storage_errors.push(FailedUrl {
            url: url.into(),
            error: error.to_string(),
        });
    }

    pub fn record_emitted(&mut self, count: usize) {
        self.records_emitted += count;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// 是否没有任何失败或跳过
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
            && self.failed.is_empty()
            && self.extraction_errors.is_empty()
            && self.storage_errors.is_empty()
    }

    /// 合并另一个摘要（如分页游走器的局部摘要）
    pub fn merge(&mut self, other: SessionSummary) {
        self.fetched.extend(other.fetched);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
        self.extraction_errors.extend(other.extraction_errors);
        self.storage_errors.extend(other.storage_errors);
        self.records_emitted += other.records_emitted;
    }
}
