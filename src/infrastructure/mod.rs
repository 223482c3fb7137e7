// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// - 指标（metrics）：Prometheus 导出
/// - 存储（storage）：记录仓库的内存和 JSON Lines 实现
pub mod metrics;
pub mod storage;
