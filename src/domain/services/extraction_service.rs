// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use scraper::{Html, Selector};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::domain::models::fetch_result::FetchResult;
use crate::domain::models::record::{Record, RecordKind};
use crate::utils::url_utils::resolve_url;

/// 提取错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// 页面内容为空
    #[error("Empty document at {0}")]
    EmptyDocument(String),
    /// 不支持的内容类型
    #[error("Unsupported content type '{content_type}' at {url}")]
    UnsupportedContent { url: String, content_type: String },
    /// 无法解析页面URL
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    /// 无效的CSS选择器
    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),
}

/// 解析CSS选择器
pub fn parse_selector(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|_| ExtractionError::InvalidSelector(selector.to_string()))
}

/// 提取器特质
///
/// 消费原始抓取结果，返回零条或多条记录
pub trait Extractor: Send + Sync {
    fn extract(&self, page: &FetchResult) -> Result<Vec<Record>, ExtractionError>;
}

/// HTML提取器
///
/// 提取标题、正文、链接、图片、视频和 ld+json 片段。标题随正文开关一起提取
pub struct HtmlExtractor {
    pub extract_text: bool,
    pub extract_links: bool,
    pub extract_images: bool,
    pub extract_videos: bool,
    pub extract_json: bool,
    title_selector: Selector,
    text_selector: Selector,
    link_selector: Selector,
    image_selector: Selector,
    video_selector: Selector,
    json_selector: Selector,
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlExtractor {
    pub fn new() -> Self {
        Self {
            extract_text: true,
            extract_links: true,
            extract_images: true,
            extract_videos: true,
            extract_json: true,
            title_selector: Selector::parse("title").expect("static selector"),
            text_selector: Selector::parse("p, h1, h2, h3, h4, h5, h6").expect("static selector"),
            link_selector: Selector::parse("a[href]").expect("static selector"),
            image_selector: Selector::parse("img[src]").expect("static selector"),
            video_selector: Selector::parse("video[src]").expect("static selector"),
            json_selector: Selector::parse(r#"script[type="application/ld+json"]"#)
                .expect("static selector"),
        }
    }

    fn title_record(&self, document: &Html, source: &str) -> Option<Record> {
        let title = document
            .select(&self.title_selector)
            .next()?
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        (!title.is_empty()).then(|| Record::new(source, RecordKind::Title { title }))
    }

    fn text_records(&self, document: &Html, source: &str) -> Option<Record> {
        let text = document
            .select(&self.text_selector)
            .map(|e| e.text().collect::<Vec<_>>().join(" "))
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!text.is_empty()).then(|| Record::text(source, text))
    }

    fn link_records(&self, document: &Html, base: &Url, source: &str) -> Vec<Record> {
        document
            .select(&self.link_selector)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                let resolved = resolve_url(base, href).ok()?;
                if !matches!(resolved.scheme(), "http" | "https") {
                    return None;
                }
                let text = a.text().collect::<Vec<_>>().join(" ");
                Some(Record::link(source, resolved.to_string(), text.trim()))
            })
            .collect()
    }

    fn image_records(&self, document: &Html, base: &Url, source: &str) -> Vec<Record> {
        document
            .select(&self.image_selector)
            .filter_map(|img| {
                let src = img.value().attr("src")?;
                let resolved = resolve_url(base, src).ok()?;
                Some(Record::new(
                    source,
                    RecordKind::Image {
                        src: resolved.to_string(),
                        alt: img.value().attr("alt").map(str::to_string),
                    },
                ))
            })
            .collect()
    }

    fn video_records(&self, document: &Html, base: &Url, source: &str) -> Vec<Record> {
        document
            .select(&self.video_selector)
            .filter_map(|video| {
                let src = resolve_url(base, video.value().attr("src")?).ok()?;
                let poster = video
                    .value()
                    .attr("poster")
                    .filter(|p| !p.trim().is_empty())
                    .and_then(|p| resolve_url(base, p).ok())
                    .map(|p| p.to_string());
                Some(Record::new(
                    source,
                    RecordKind::Video {
                        src: src.to_string(),
                        poster,
                    },
                ))
            })
            .collect()
    }

    fn json_records(&self, document: &Html, source: &str) -> Vec<Record> {
        document
            .select(&self.json_selector)
            .filter_map(|script| {
                let raw = script.text().collect::<String>();
                match serde_json::from_str::<serde_json::Value>(raw.trim()) {
                    Ok(value) => Some(Record::new(source, RecordKind::Json { value })),
                    Err(e) => {
                        // one broken block should not drop the rest of the page
                        warn!("Skipping malformed ld+json block on {}: {}", source, e);
                        None
                    }
                }
            })
            .collect()
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self, page: &FetchResult) -> Result<Vec<Record>, ExtractionError> {
        let source = page.final_url.as_str();
        if page.content.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument(source.to_string()));
        }
        if !page.is_html() {
            return Err(ExtractionError::UnsupportedContent {
                url: source.to_string(),
                content_type: page.content_type.clone(),
            });
        }
        let base =
            Url::parse(source).map_err(|_| ExtractionError::InvalidBaseUrl(source.to_string()))?;

        let document = Html::parse_document(&page.content);
        let mut records = Vec::new();

        if self.extract_text {
            records.extend(self.title_record(&document, source));
            records.extend(self.text_records(&document, source));
        }
        if self.extract_links {
            records.extend(self.link_records(&document, &base, source));
        }
        if self.extract_images {
            records.extend(self.image_records(&document, &base, source));
        }
        if self.extract_videos {
            records.extend(self.video_records(&document, &base, source));
        }
        if self.extract_json {
            records.extend(self.json_records(&document, source));
        }

        Ok(records)
    }
}

/// "下一页"链接定位器
pub struct NextLinkLocator {
    selector: Selector,
}

impl NextLinkLocator {
    pub fn new(selector: &str) -> Result<Self, ExtractionError> {
        Ok(Self {
            selector: parse_selector(selector)?,
        })
    }

    /// 在页面中查找下一页链接，并以最终URL为基准解析为绝对地址
    pub fn locate(&self, page: &FetchResult) -> Option<String> {
        let base = Url::parse(&page.final_url).ok()?;
        let document = Html::parse_document(&page.content);
        document
            .select(&self.selector)
            .filter_map(|e| e.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty() && !href.starts_with('#'))
            .find_map(|href| {
                resolve_url(&base, href)
                    .ok()
                    .filter(|url| matches!(url.scheme(), "http" | "https"))
            })
            .map(|url| url.to_string())
    }
}
