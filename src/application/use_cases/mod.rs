// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 用例模块
///
/// - 页面流水线（page_pipeline）：抓取、提取、发射
/// - 分页游走（pagination_walker）：沿"下一页"链接惰性抓取
/// - 抓取会话（scrape_session）：装配配置、并行抓取与取消
pub mod page_pipeline;
pub mod pagination_walker;
pub mod scrape_session;
