// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use tracing::info;

use crate::config::settings::{BrowserSettings, ScrapingSettings};
use crate::domain::models::fetch_request::FetchMode;
use crate::engines::dynamic_engine::DynamicFetch;
use crate::engines::static_engine::StaticFetch;
use crate::engines::traits::{FetchEngine, FetchError};

/// 根据配置选择抓取引擎
///
/// # 参数
///
/// * `scraping` - 抓取配置（模式与浏览器类型）
/// * `browser` - 浏览器配置，仅动态模式使用
///
/// # 返回值
///
/// * `Ok(Arc<dyn FetchEngine>)` - 选定的引擎
/// * `Err(FetchError::InvalidRequest)` - 浏览器类型不受支持
pub fn build_engine(
    scraping: &ScrapingSettings,
    browser: &BrowserSettings,
) -> Result<Arc<dyn FetchEngine>, FetchError> {
    let engine: Arc<dyn FetchEngine> = match scraping.mode {
        FetchMode::Static => Arc::new(StaticFetch::new()),
        FetchMode::Dynamic => Arc::new(DynamicFetch::new(
            browser.clone(),
            scraping.browser_type,
        )?),
    };
    info!("Using {} fetch engine", engine.name());
    Ok(engine)
}
