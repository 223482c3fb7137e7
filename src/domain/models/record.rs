// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 记录内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordKind {
    /// 页面标题
    Title { title: String },
    /// 页面正文
    Text { content: String },
    /// 图片引用
    Image { src: String, alt: Option<String> },
    /// 链接
    Link { href: String, text: String },
    /// 视频引用
    Video { src: String, poster: Option<String> },
    /// JSON片段（如 ld+json）
    Json { value: serde_json::Value },
}

/// 提取记录
///
/// 与来源URL绑定的结构化数据，创建后不可变，所有权交给存储协作方
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// 记录唯一标识符
    pub id: Uuid,
    /// 来源URL
    pub source_url: String,
    /// 记录内容
    #[serde(flatten)]
    pub kind: RecordKind,
    /// 提取时间
    pub extracted_at: DateTime<Utc>,
}

impl Record {
    pub fn new(source_url: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_url: source_url.into(),
            kind,
            extracted_at: Utc::now(),
        }
    }

    pub fn text(source_url: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            source_url,
            RecordKind::Text {
                content: content.into(),
            },
        )
    }

    pub fn link(
        source_url: impl Into<String>,
        href: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            source_url,
            RecordKind::Link {
                href: href.into(),
                text: text.into(),
            },
        )
    }

    /// 记录类型名称
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            RecordKind::Title { .. } => "title",
            RecordKind::Text { .. } => "text",
            RecordKind::Image { .. } => "image",
            RecordKind::Link { .. } => "link",
            RecordKind::Video { .. } => "video",
            RecordKind::Json { .. } => "json",
        }
    }
}
