// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 分页游走、并行抓取和会话装配
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心实体、领域服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 静态和动态抓取引擎及重试执行器
pub mod engines;

/// 基础设施模块
///
/// 存储实现和指标导出
pub mod infrastructure;

/// 队列模块
///
/// 工作者共享的URL队列
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 并行抓取工作者及其管理
pub mod workers;
