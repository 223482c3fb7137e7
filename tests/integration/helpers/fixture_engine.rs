// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use galera::domain::models::fetch_request::{FetchMode, FetchRequest};
use galera::domain::models::fetch_result::FetchResult;
use galera::domain::models::identity::Identity;
use galera::engines::traits::{FetchEngine, FetchError};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// 从内存固定页面返回结果的引擎
#[derive(Default)]
pub struct FixtureEngine {
    pages: HashMap<String, String>,
    failures: HashMap<String, FetchError>,
    content_types: HashMap<String, String>,
    panics: HashSet<String>,
    fetches: Mutex<Vec<String>>,
}

impl FixtureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    /// 覆盖该URL返回的内容类型
    pub fn with_content_type(mut self, url: &str, content_type: &str) -> Self {
        self.content_types
            .insert(url.to_string(), content_type.to_string());
        self
    }

    /// 抓取该URL时引擎崩溃
    pub fn with_panic(mut self, url: &str) -> Self {
        self.panics.insert(url.to_string());
        self
    }

    /// 该URL的每次尝试都返回给定错误
    pub fn with_failure(mut self, url: &str, error: FetchError) -> Self {
        self.failures.insert(url.to_string(), error);
        self
    }

    /// 按顺序记录的抓取尝试
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl FetchEngine for FixtureEngine {
    async fn fetch(
        &self,
        request: &FetchRequest,
        _identity: &Identity,
    ) -> Result<FetchResult, FetchError> {
        self.fetches.lock().unwrap().push(request.url.clone());

        if self.panics.contains(&request.url) {
            panic!("fixture engine crashed on {}", request.url);
        }
        if let Some(error) = self.failures.get(&request.url) {
            return Err(error.clone());
        }
        match self.pages.get(&request.url) {
            Some(html) => {
                let mut result =
                    FetchResult::new(request.id, &request.url, &request.url, 200, html.as_str());
                if let Some(content_type) = self.content_types.get(&request.url) {
                    result.content_type = content_type.clone();
                }
                Ok(result)
            }
            None => Err(FetchError::Network(format!("no fixture for {}", request.url))),
        }
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Static
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

/// 分页页面：`next` 为 Some 时带有 rel=next 链接
pub fn paginated_page(title: &str, next: Option<&str>) -> String {
    let next_link = next
        .map(|href| format!(r#"<a rel="next" href="{}">Next</a>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><body><h1>{}</h1><p>Body of {}</p><img src="/img/{}.png" alt="{}">{}</body></html>"#,
        title, title, title, title, next_link
    )
}

/// 构造 page/1 .. page/n 的分页链，最后一页没有下一页链接
pub fn chain(engine: FixtureEngine, base: &str, pages: usize) -> FixtureEngine {
    (1..=pages).fold(engine, |engine, i| {
        let next = (i < pages).then(|| format!("/page/{}", i + 1));
        engine.with_page(
            &format!("{}/page/{}", base, i),
            paginated_page(&format!("Page {}", i), next.as_deref()),
        )
    })
}
