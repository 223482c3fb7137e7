// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// 抓取模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// 静态HTML抓取
    #[default]
    Static,
    /// 浏览器渲染抓取
    Dynamic,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::Static => write!(f, "static"),
            FetchMode::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// HTTP方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FetchMethod {
    #[default]
    Get,
    Head,
}

/// 抓取请求
///
/// 每个待抓取的页面对应一个请求，发出后不再修改
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 请求唯一标识符
    pub id: Uuid,
    /// 目标URL
    pub url: String,
    /// 抓取模式
    pub mode: FetchMode,
    /// HTTP方法（仅静态模式）
    pub method: FetchMethod,
    /// 最大尝试次数
    pub retry_limit: u32,
    /// 单次尝试超时时间
    pub timeout: Duration,
    /// 额外请求头
    pub headers: HashMap<String, String>,
    /// 发出时间
    pub issued_at: DateTime<Utc>,
}

impl FetchRequest {
    /// 创建新的抓取请求
    ///
    /// # 参数
    ///
    /// * `url` - 目标URL
    /// * `mode` - 抓取模式
    ///
    /// # 返回值
    ///
    /// 使用默认重试次数（3）和超时时间（30秒）的请求
    pub fn new(url: impl Into<String>, mode: FetchMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            mode,
            method: FetchMethod::Get,
            retry_limit: 3,
            timeout: Duration::from_secs(30),
            headers: HashMap::new(),
            issued_at: Utc::now(),
        }
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_method(mut self, method: FetchMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// 请求模板
///
/// 保存从配置中得到的公共参数，用于为发现的每个URL生成请求
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub mode: FetchMode,
    pub retry_limit: u32,
    pub timeout: Duration,
    pub headers: HashMap<String, String>,
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self {
            mode: FetchMode::Static,
            retry_limit: 3,
            timeout: Duration::from_secs(30),
            headers: HashMap::new(),
        }
    }
}

impl RequestTemplate {
    /// 为指定URL生成请求
    pub fn request_for(&self, url: impl Into<String>) -> FetchRequest {
        FetchRequest::new(url, self.mode)
            .with_retry_limit(self.retry_limit)
            .with_timeout(self.timeout)
            .with_headers(self.headers.clone())
    }
}
