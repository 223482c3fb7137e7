// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 抓取结果
///
/// 由抓取引擎产生，被提取器消费一次后丢弃。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    /// 关联的请求ID
    pub request_id: Uuid,
    /// 请求的URL
    pub requested_url: String,
    /// 最终URL（重定向之后）
    pub final_url: String,
    /// HTTP状态码
    pub status_code: u16,
    /// 响应内容
    pub content: String,
    /// 内容类型
    pub content_type: String,
    /// 响应头
    pub headers: HashMap<String, String>,
    /// 抓取完成时间
    pub fetched_at: DateTime<Utc>,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

impl FetchResult {
    pub fn new(
        request_id: Uuid,
        requested_url: impl Into<String>,
        final_url: impl Into<String>,
        status_code: u16,
        content: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            requested_url: requested_url.into(),
            final_url: final_url.into(),
            status_code,
            content: content.into(),
            content_type: "text/html".to_string(),
            headers: HashMap::new(),
            fetched_at: Utc::now(),
            response_time_ms: 0,
        }
    }

    pub fn is_html(&self) -> bool {
        let ct = self.content_type.to_ascii_lowercase();
        ct.contains("html") || ct.contains("xml")
    }

    pub fn was_redirected(&self) -> bool {
        self.requested_url != self.final_url
    }
}
