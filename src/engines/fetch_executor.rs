// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::counter;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::models::fetch_request::FetchRequest;
use crate::domain::models::fetch_result::FetchResult;
use crate::domain::services::human_pacer::HumanPacer;
use crate::domain::services::identity_rotator::IdentityRotator;
use crate::engines::traits::{FetchEngine, FetchError};
use crate::utils::retry_policy::RetryPolicy;

/// 渲染超时允许的重试次数
const RENDER_TIMEOUT_RETRIES: u32 = 1;

/// 抓取执行器
///
/// 在抓取引擎外围执行有界重试循环：每次尝试前由节奏模拟器等待，封禁时轮换身份，
/// 网络错误时按退避策略等待。`retry_limit` 是所有可重试错误共享的总尝试次数。
pub struct FetchExecutor {
    engine: Arc<dyn FetchEngine>,
    rotator: Arc<IdentityRotator>,
    pacer: Arc<HumanPacer>,
    retry_policy: RetryPolicy,
}

impl FetchExecutor {
    pub fn new(
        engine: Arc<dyn FetchEngine>,
        rotator: Arc<IdentityRotator>,
        pacer: Arc<HumanPacer>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            engine,
            rotator,
            pacer,
            retry_policy,
        }
    }

    pub fn rotator(&self) -> &Arc<IdentityRotator> {
        &self.rotator
    }

    pub fn pacer(&self) -> &Arc<HumanPacer> {
        &self.pacer
    }

    fn exhausted(&self, request: &FetchRequest, attempts: u32, last: &FetchError) -> FetchError {
        warn!(
            "Giving up on {} after {} attempts: {}",
            request.url, attempts, last
        );
        counter!("galera_fetch_failures_total", "kind" => last.kind()).increment(1);
        FetchError::FetchFailed {
            url: request.url.clone(),
            attempts,
            last_error: last.to_string(),
        }
    }

    /// 执行抓取请求
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResult)` - 某次尝试成功
    /// * `Err(FetchError::FetchFailed)` - 重试预算耗尽或渲染超时升级
    /// * `Err(FetchError::PoolExhausted | InvalidRequest)` - 终止性错误，不重试
    #[instrument(skip(self, request), fields(url = %request.url, engine = self.engine.name()))]
    pub async fn execute(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        let budget = request.retry_limit.max(1);
        let attempt_timeout = self.engine.attempt_timeout(request);
        let mut identity = self.rotator.next()?;
        let mut render_timeouts = 0u32;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.pacer.delay().await;
            counter!("galera_fetch_attempts_total", "engine" => self.engine.name()).increment(1);

            let outcome =
                match tokio::time::timeout(attempt_timeout, self.engine.fetch(request, &identity))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(FetchError::Network(format!(
                        "attempt timed out after {:?}",
                        attempt_timeout
                    ))),
                };

            let error = match outcome {
                Ok(result) => {
                    self.rotator.report_success(&identity);
                    counter!("galera_pages_fetched_total").increment(1);
                    return Ok(result);
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                counter!("galera_fetch_failures_total", "kind" => error.kind()).increment(1);
                return Err(error);
            }
            if let FetchError::RenderTimeout(_) = error {
                render_timeouts += 1;
                if render_timeouts > RENDER_TIMEOUT_RETRIES {
                    return Err(self.exhausted(request, attempt, &error));
                }
            }
            if attempt >= budget {
                return Err(self.exhausted(request, attempt, &error));
            }

            match &error {
                FetchError::Blocked { status, reason } => {
                    info!(
                        "Blocked ({}: {}) on attempt {}/{}, rotating identity",
                        status, reason, attempt, budget
                    );
                    self.rotator.report_failure(&identity);
                    identity = self.rotator.next()?;
                    counter!("galera_identity_rotations_total").increment(1);
                    tokio::time::sleep(self.retry_policy.calculate_backoff(attempt)).await;
                }
                FetchError::Network(message) => {
                    let backoff = self.retry_policy.calculate_backoff(attempt);
                    warn!(
                        "Network error on attempt {}/{}: {}, retrying in {:?}",
                        attempt, budget, message, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                _ => {
                    warn!("{} on attempt {}/{}, retrying", error, attempt, budget);
                }
            }
        }
    }
}
