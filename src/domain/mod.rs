// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含抓取管线的核心逻辑，包括：
/// - 领域模型（models）：请求、身份、抓取结果、记录和会话摘要
/// - 仓库接口（repositories）：记录存储的抽象接口
/// - 服务（services）：身份轮换、节奏模拟、去重账本、内容提取和结果发射
///
/// 领域层不依赖于任何具体的网络或存储实现。
pub mod models;
pub mod repositories;
pub mod services;
