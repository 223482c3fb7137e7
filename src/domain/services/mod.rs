// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 去重账本（dedup_ledger）：记录已抓取的URL及冷却窗口
/// - 提取服务（extraction_service）：从页面中提取记录并定位下一页链接
/// - 人类节奏模拟（human_pacer）：随机延迟与请求顺序扰动
/// - 身份轮换（identity_rotator）：为每个请求选择 (User-Agent, 代理) 身份
/// - 结果发射（result_emitter）：把记录交给存储协作方
pub mod dedup_ledger;
pub mod extraction_service;
pub mod human_pacer;
pub mod identity_rotator;
pub mod result_emitter;
