// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use chrono::Utc;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::settings::{BrowserSettings, BrowserType};
use crate::domain::models::fetch_request::{FetchMode, FetchRequest};
use crate::domain::models::fetch_result::FetchResult;
use crate::domain::models::identity::Identity;
use crate::engines::block_detector::detect_block;
use crate::engines::traits::{FetchEngine, FetchError};

/// 轮询 document.readyState 的间隔
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 启动浏览器、打开标签页和读取内容的时间余量
const LAUNCH_SLACK: Duration = Duration::from_secs(15);

/// 每次滚动脚本执行的时间余量
const SCROLL_EVAL_SLACK: Duration = Duration::from_secs(1);

/// 标签页守卫
///
/// 正常路径上由 `close()` 显式关闭；尝试被外部超时或取消丢弃时，
/// 在后台任务中关闭标签页。
struct PageGuard {
    page: Page,
    armed: bool,
}

impl PageGuard {
    fn new(page: Page) -> Self {
        Self { page, armed: true }
    }

    async fn close(mut self) {
        self.armed = false;
        if let Err(e) = self.page.clone().close().await {
            debug!("Failed to close page: {}", e);
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let page = self.page.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = page.close().await {
                        debug!("Failed to close abandoned page: {}", e);
                    }
                });
            }
            Err(_) => warn!("No runtime available to close abandoned page"),
        }
    }
}

fn cdp_error(e: CdpError) -> FetchError {
    FetchError::Network(e.to_string())
}

/// 动态抓取引擎
///
/// 基于chromiumoxide驱动无头浏览器。每个代理对应一个浏览器进程（代理只能在启动时指定），
/// 浏览器在首次使用时启动并在之后复用；每次抓取使用独立的标签页。
pub struct DynamicFetch {
    settings: BrowserSettings,
    browser_type: BrowserType,
    /// 按代理分组的浏览器实例
    browsers: Mutex<HashMap<Option<String>, Browser>>,
}

impl DynamicFetch {
    /// 创建动态抓取引擎
    ///
    /// # 参数
    ///
    /// * `settings` - 浏览器配置
    /// * `browser_type` - 浏览器类型
    ///
    /// # 返回值
    ///
    /// * `Ok(DynamicFetch)` - 引擎（浏览器延迟启动）
    /// * `Err(FetchError::InvalidRequest)` - 浏览器类型无法通过CDP驱动
    pub fn new(settings: BrowserSettings, browser_type: BrowserType) -> Result<Self, FetchError> {
        if browser_type == BrowserType::Firefox {
            return Err(FetchError::InvalidRequest(
                "browser_type 'firefox' cannot be driven over CDP; use chrome, chromium or edge"
                    .to_string(),
            ));
        }
        if browser_type == BrowserType::Edge && settings.executable_path.is_none() {
            warn!("browser_type 'edge' without executable_path falls back to Chrome/Chromium detection");
        }

        Ok(Self {
            settings,
            browser_type,
            browsers: Mutex::new(HashMap::new()),
        })
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.render_timeout_secs)
    }

    /// 一次渲染抓取各阶段耗时的上限：启动余量 + 就绪等待 + 滚动
    pub fn render_budget(&self) -> Duration {
        let scroll = if self.settings.scroll_to_bottom {
            (Duration::from_millis(self.settings.scroll_pause_ms) + SCROLL_EVAL_SLACK)
                * self.settings.max_scroll_attempts
        } else {
            Duration::ZERO
        };
        LAUNCH_SLACK + self.render_timeout() + scroll
    }

    async fn start_browser(&self, proxy: Option<&str>) -> Result<Browser, FetchError> {
        let (browser, mut handler) = if let Some(url) = &self.settings.remote_debugging_url {
            info!("Connecting to remote browser at: {}", url);
            Browser::connect(url.as_str()).await.map_err(cdp_error)?
        } else {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(self.render_timeout())
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage");
            if !self.settings.headless {
                builder = builder.with_head();
            }
            if let Some(path) = &self.settings.executable_path {
                builder = builder.chrome_executable(path);
            }
            if let Some(proxy) = proxy {
                builder = builder.arg(format!("--proxy-server={}", proxy));
            }

            let config = builder.build().map_err(FetchError::InvalidRequest)?;
            info!(
                "Launching {:?} browser ({})",
                self.browser_type,
                proxy.unwrap_or("direct")
            );
            Browser::launch(config).await.map_err(cdp_error)?
        };

        // The handler drives the CDP connection and must be polled for the browser to work
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    /// 取得（必要时启动）身份对应的浏览器并打开新标签页
    async fn open_page(&self, identity: &Identity) -> Result<Page, FetchError> {
        let key = if self.settings.remote_debugging_url.is_some() {
            if identity.proxy.is_some() {
                debug!("Remote browser ignores identity proxy");
            }
            None
        } else {
            identity.proxy.clone()
        };

        let mut browsers = self.browsers.lock().await;
        if !browsers.contains_key(&key) {
            let browser = self.start_browser(key.as_deref()).await?;
            browsers.insert(key.clone(), browser);
        }
        let browser = browsers
            .get(&key)
            .ok_or_else(|| FetchError::Network("browser unavailable".to_string()))?;
        browser.new_page("about:blank").await.map_err(cdp_error)
    }

    async fn wait_until_ready(&self, page: &Page, url: &str) -> Result<(), FetchError> {
        let deadline = self.render_timeout();
        tokio::time::timeout(deadline, async {
            page.goto(url).await.map_err(cdp_error)?;
            loop {
                let state: String = page
                    .evaluate("document.readyState")
                    .await
                    .map_err(cdp_error)?
                    .into_value()
                    .map_err(|e| FetchError::Network(e.to_string()))?;
                if state == "complete" {
                    return Ok::<(), FetchError>(());
                }
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
        })
        .await
        .map_err(|_| FetchError::RenderTimeout(deadline))?
    }

    /// 滚动到底部，直到页面高度不再变化或达到最大次数
    async fn scroll_to_bottom(&self, page: &Page) -> Result<(), FetchError> {
        let pause = Duration::from_millis(self.settings.scroll_pause_ms);
        let mut last_height = 0u64;
        for attempt in 0..self.settings.max_scroll_attempts {
            let height: u64 = page
                .evaluate("window.scrollTo(0, document.body.scrollHeight); document.body.scrollHeight")
                .await
                .map_err(cdp_error)?
                .into_value()
                .map_err(|e| FetchError::Network(e.to_string()))?;
            if height == last_height {
                debug!("Scrolling settled after {} attempts", attempt);
                break;
            }
            last_height = height;
            tokio::time::sleep(pause).await;
        }
        Ok(())
    }

    async fn render(
        &self,
        page: &Page,
        request: &FetchRequest,
        identity: &Identity,
    ) -> Result<(String, String), FetchError> {
        page.set_user_agent(identity.user_agent.as_str())
            .await
            .map_err(cdp_error)?;

        if !request.headers.is_empty() {
            let headers = serde_json::to_value(&request.headers)
                .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
            page.execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
                .await
                .map_err(cdp_error)?;
        }

        self.wait_until_ready(page, &request.url).await?;
        if self.settings.scroll_to_bottom {
            self.scroll_to_bottom(page).await?;
        }

        let final_url = page
            .url()
            .await
            .map_err(cdp_error)?
            .unwrap_or_else(|| request.url.clone());
        let content = page.content().await.map_err(cdp_error)?;
        Ok((final_url, content))
    }

    async fn close_browsers(&self) {
        let mut browsers = self.browsers.lock().await;
        for (proxy, mut browser) in browsers.drain() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser ({:?}): {}", proxy, e);
            }
        }
    }
}

#[async_trait]
impl FetchEngine for DynamicFetch {
    /// 执行浏览器渲染抓取
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResult)` - 渲染后的页面（CDP不提供主文档状态码，按200处理）
    /// * `Err(FetchError::RenderTimeout)` - 页面未在期限内就绪
    /// * `Err(FetchError)` - 其他错误
    async fn fetch(
        &self,
        request: &FetchRequest,
        identity: &Identity,
    ) -> Result<FetchResult, FetchError> {
        if url::Url::parse(&request.url).is_err() {
            return Err(FetchError::InvalidRequest(format!(
                "Invalid URL: {}",
                request.url
            )));
        }

        let start = Instant::now();
        let page = PageGuard::new(self.open_page(identity).await?);
        let outcome = self.render(&page.page, request, identity).await;
        page.close().await;
        let (final_url, content) = outcome?;

        let status_code = 200;
        if let Some(reason) = detect_block(status_code, &content) {
            return Err(FetchError::Blocked {
                status: status_code,
                reason,
            });
        }

        Ok(FetchResult {
            request_id: request.id,
            requested_url: request.url.clone(),
            final_url,
            status_code,
            content,
            content_type: "text/html".to_string(),
            headers: HashMap::new(),
            fetched_at: Utc::now(),
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Dynamic
    }

    fn name(&self) -> &'static str {
        "dynamic"
    }

    /// 外部超时不得早于渲染期限触发，否则渲染超时会被当作网络错误
    fn attempt_timeout(&self, request: &FetchRequest) -> Duration {
        request.timeout.max(self.render_budget())
    }

    /// 关闭所有浏览器
    async fn shutdown(&self) {
        self.close_browsers().await
    }
}
