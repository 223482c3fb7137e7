// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作者模块
///
/// 并行抓取URL列表的工作者池
pub mod fetch_worker;
pub mod manager;
