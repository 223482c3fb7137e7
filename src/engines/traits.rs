// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::fetch_request::{FetchMode, FetchRequest};
use crate::domain::models::fetch_result::FetchResult;
use crate::domain::models::identity::Identity;
use crate::domain::services::identity_rotator::RotatorError;

/// 抓取错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// 网络错误（连接失败、超时、5xx）
    #[error("Network error: {0}")]
    Network(String),
    /// 被目标站点封禁（403/429 或验证码页面）
    #[error("Blocked with status {status}: {reason}")]
    Blocked { status: u16, reason: String },
    /// 页面未在期限内就绪（仅动态模式）
    #[error("Page not ready within {0:?}")]
    RenderTimeout(Duration),
    /// 无效请求（URL格式错误、代理配置错误等）
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// 没有可用身份
    #[error("Identity pool exhausted")]
    PoolExhausted,
    /// 重试预算耗尽
    #[error("Fetch of {url} failed after {attempts} attempts: {last_error}")]
    FetchFailed {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

impl FetchError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 网络错误、封禁和渲染超时返回true，其余为终止性错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Network(_) | FetchError::Blocked { .. } | FetchError::RenderTimeout(_)
        )
    }

    /// 指标标签使用的错误类别
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Blocked { .. } => "blocked",
            FetchError::RenderTimeout(_) => "render_timeout",
            FetchError::InvalidRequest(_) => "invalid_request",
            FetchError::PoolExhausted => "pool_exhausted",
            FetchError::FetchFailed { .. } => "fetch_failed",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            FetchError::InvalidRequest(e.to_string())
        } else if e.is_redirect() {
            FetchError::InvalidRequest(format!("redirect limit exceeded: {}", e))
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

impl From<RotatorError> for FetchError {
    fn from(e: RotatorError) -> Self {
        match e {
            RotatorError::PoolExhausted => FetchError::PoolExhausted,
        }
    }
}

/// 抓取引擎特质
///
/// 静态和动态两种实现由配置选择，调用方只依赖这个接口
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// 以给定身份执行一次抓取尝试
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    /// * `identity` - 本次尝试使用的身份
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResult)` - 抓取结果
    /// * `Err(FetchError)` - 本次尝试的错误，重试由调用方决定
    async fn fetch(
        &self,
        request: &FetchRequest,
        identity: &Identity,
    ) -> Result<FetchResult, FetchError>;

    /// 引擎对应的抓取模式
    fn mode(&self) -> FetchMode;

    /// 引擎名称
    fn name(&self) -> &'static str;

    /// 单次尝试的时间上限
    ///
    /// 默认为请求超时；自带内部期限的引擎应返回覆盖其全部阶段的上限，
    /// 以便内部错误（如渲染超时）先于外部超时出现
    fn attempt_timeout(&self, request: &FetchRequest) -> Duration {
        request.timeout
    }

    /// 释放引擎持有的外部资源（如浏览器进程）
    async fn shutdown(&self) {}
}

#[async_trait]
impl<T: FetchEngine + ?Sized> FetchEngine for Arc<T> {
    async fn fetch(
        &self,
        request: &FetchRequest,
        identity: &Identity,
    ) -> Result<FetchResult, FetchError> {
        (**self).fetch(request, identity).await
    }

    fn mode(&self) -> FetchMode {
        (**self).mode()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn attempt_timeout(&self, request: &FetchRequest) -> Duration {
        (**self).attempt_timeout(request)
    }

    async fn shutdown(&self) {
        (**self).shutdown().await
    }
}
