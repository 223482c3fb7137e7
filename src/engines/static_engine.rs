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
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::domain::models::fetch_request::{FetchMethod, FetchMode, FetchRequest};
use crate::domain::models::fetch_result::FetchResult;
use crate::domain::models::identity::Identity;
use crate::engines::block_detector::detect_block;
use crate::engines::traits::{FetchEngine, FetchError};

/// 最大重定向次数
const MAX_REDIRECTS: usize = 10;

/// 静态抓取引擎
///
/// 基于reqwest的HTTP抓取，User-Agent和代理取自当前身份
pub struct StaticFetch {
    max_redirects: usize,
}

impl Default for StaticFetch {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticFetch {
    pub fn new() -> Self {
        Self {
            max_redirects: MAX_REDIRECTS,
        }
    }

    fn build_client(
        &self,
        request: &FetchRequest,
        identity: &Identity,
    ) -> Result<reqwest::Client, FetchError> {
        // Each identity gets a fresh client so cookies never leak between identities
        let mut builder = reqwest::Client::builder()
            .user_agent(identity.user_agent.as_str())
            .timeout(request.timeout)
            .cookie_store(true)
            .redirect(Policy::limited(self.max_redirects));

        if let Some(proxy_url) = &identity.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| FetchError::InvalidRequest(format!("Invalid proxy {}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(builder.build()?)
    }
}

fn build_headers(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (k, v) in headers {
        match (HeaderName::from_bytes(k.as_bytes()), HeaderValue::from_str(v)) {
            (Ok(k), Ok(v)) => {
                map.insert(k, v);
            }
            _ => warn!("Skipping invalid header {}", k),
        }
    }
    map
}

#[async_trait]
impl FetchEngine for StaticFetch {
    /// 执行HTTP抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    /// * `identity` - 当前身份
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResult)` - 抓取结果（非封禁的4xx也作为结果返回）
    /// * `Err(FetchError)` - 网络错误、5xx、封禁或无效请求
    async fn fetch(
        &self,
        request: &FetchRequest,
        identity: &Identity,
    ) -> Result<FetchResult, FetchError> {
        let url = Url::parse(&request.url)
            .map_err(|e| FetchError::InvalidRequest(format!("{}: {}", request.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidRequest(format!(
                "Unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let client = self.build_client(request, identity)?;
        let builder = match request.method {
            FetchMethod::Get => client.get(url),
            FetchMethod::Head => client.head(url),
        };

        let start = Instant::now();
        let response = builder.headers(build_headers(&request.headers)).send().await?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("text/html")
            .to_string();

        let mut headers = HashMap::new();
        for (k, v) in response.headers() {
            if let Ok(v) = v.to_str() {
                headers.insert(k.as_str().to_string(), v.to_string());
            }
        }

        let content = match request.method {
            FetchMethod::Get => response.text().await?,
            FetchMethod::Head => String::new(),
        };

        if let Some(reason) = detect_block(status_code, &content) {
            return Err(FetchError::Blocked {
                status: status_code,
                reason,
            });
        }
        if status_code >= 500 {
            return Err(FetchError::Network(format!(
                "Server error {} from {}",
                status_code, final_url
            )));
        }

        debug!(
            "Fetched {} -> {} ({}) in {:?}",
            request.url,
            final_url,
            status_code,
            start.elapsed()
        );

        Ok(FetchResult {
            request_id: request.id,
            requested_url: request.url.clone(),
            final_url,
            status_code,
            content,
            content_type,
            headers,
            fetched_at: Utc::now(),
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Static
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
#[path = "static_engine_test.rs"]
mod tests;
