// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了抓取管线的核心数据结构，包括：
/// - 抓取请求（fetch_request）：一次页面抓取的目标和参数
/// - 身份（identity）：User-Agent 与代理的组合
/// - 抓取结果（fetch_result）：页面的原始内容和响应信息
/// - 记录（record）：从页面中提取出的结构化数据
/// - 会话摘要（session_summary）：抓取、跳过和失败的URL汇总
pub mod fetch_request;
pub mod fetch_result;
pub mod identity;
pub mod record;
pub mod session_summary;
