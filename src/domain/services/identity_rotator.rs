// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::settings::IdentitySettings;
use crate::domain::models::identity::Identity;

/// 身份轮换错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RotatorError {
    /// 身份池为空或全部被停用
    #[error("Identity pool exhausted")]
    PoolExhausted,
}

/// 轮换策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    /// 轮询
    #[default]
    RoundRobin,
    /// 加权随机
    WeightedRandom,
}

/// 身份槽位
#[derive(Debug, Clone)]
struct IdentitySlot {
    identity: Identity,
    /// 权重，至少为 1
    weight: u32,
    /// 连续失败次数
    failures: u32,
    enabled: bool,
}

/// 轮换内部状态
#[derive(Debug)]
struct RotatorState {
    slots: Vec<IdentitySlot>,
    /// 轮询游标
    cursor: usize,
    /// 最近选择的槽位索引
    recent: VecDeque<usize>,
    /// 总选择次数
    selections: u64,
}

/// 身份轮换器
///
/// 从 (User-Agent, 代理) 池中为每个请求选择一个身份，保证在最近 k 次选择中不重复使用同一身份。
/// 多个工作者共享同一个实例，内部状态由互斥锁保护。
#[derive(Debug)]
pub struct IdentityRotator {
    state: Mutex<RotatorState>,
    strategy: RotationStrategy,
    /// 复用窗口 k，默认等于池大小
    reuse_window: usize,
    /// 连续失败多少次后停用，0 表示从不停用
    max_failures: u32,
}

impl IdentityRotator {
    /// 创建新的身份轮换器
    ///
    /// # 参数
    ///
    /// * `pool` - 身份池
    /// * `strategy` - 轮换策略
    ///
    /// # 返回值
    ///
    /// 复用窗口等于池大小、失败阈值为 3 的轮换器
    pub fn new(pool: Vec<Identity>, strategy: RotationStrategy) -> Self {
        let reuse_window = pool.len();
        let slots = pool
            .into_iter()
            .map(|identity| IdentitySlot {
                identity,
                weight: 1,
                failures: 0,
                enabled: true,
            })
            .collect();

        Self {
            state: Mutex::new(RotatorState {
                slots,
                cursor: 0,
                recent: VecDeque::new(),
                selections: 0,
            }),
            strategy,
            reuse_window,
            max_failures: 3,
        }
    }

    /// 根据配置创建轮换器
    ///
    /// `use_proxies` 为 false 时忽略配置中的代理
    pub fn from_settings(settings: &IdentitySettings, use_proxies: bool) -> Self {
        let proxies: &[String] = if use_proxies { &settings.proxies } else { &[] };
        let pool = Identity::build_pool(&settings.user_agents, proxies);
        info!(
            "Identity pool built: {} identities, strategy {:?}",
            pool.len(),
            settings.strategy
        );

        let mut rotator = Self::new(pool, settings.strategy)
            .with_max_failures(settings.max_failures)
            .with_weights(&settings.weights);
        if let Some(window) = settings.reuse_window {
            rotator = rotator.with_reuse_window(window);
        }
        rotator
    }

    pub fn with_reuse_window(mut self, window: usize) -> Self {
        self.reuse_window = window.max(1);
        self
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }

    /// 设置加权随机策略使用的权重，按池顺序对应；小于 1 的权重按 1 处理
    pub fn with_weights(self, weights: &[u32]) -> Self {
        {
            let mut state = self.state.lock();
            for (slot, weight) in state.slots.iter_mut().zip(weights) {
                slot.weight = (*weight).max(1);
            }
        }
        self
    }

    /// 选择下一个身份
    ///
    /// # 返回值
    ///
    /// * `Ok(Identity)` - 不在最近 k-1 次选择中的可用身份
    /// * `Err(RotatorError::PoolExhausted)` - 没有可用身份
    pub fn next(&self) -> Result<Identity, RotatorError> {
        let mut state = self.state.lock();

        let enabled = state.slots.iter().filter(|s| s.enabled).count();
        if enabled == 0 {
            return Err(RotatorError::PoolExhausted);
        }

        // The window shrinks with the enabled set so a candidate always remains
        let window = self.reuse_window.min(enabled).max(1);
        let keep = window - 1;
        while state.recent.len() > keep {
            state.recent.pop_front();
        }

        let index = match self.strategy {
            RotationStrategy::RoundRobin => Self::pick_round_robin(&state),
            RotationStrategy::WeightedRandom => Self::pick_weighted(&state),
        }
        .ok_or(RotatorError::PoolExhausted)?;

        state.cursor = (index + 1) % state.slots.len();
        if keep > 0 {
            state.recent.push_back(index);
            if state.recent.len() > keep {
                state.recent.pop_front();
            }
        }
        state.selections += 1;

        let identity = state.slots[index].identity.clone();
        debug!("Selected identity #{}: {}", index, identity);
        Ok(identity)
    }

    fn is_candidate(state: &RotatorState, index: usize) -> bool {
        state.slots[index].enabled && !state.recent.contains(&index)
    }

    fn pick_round_robin(state: &RotatorState) -> Option<usize> {
        let len = state.slots.len();
        (0..len)
            .map(|offset| (state.cursor + offset) % len)
            .find(|&index| Self::is_candidate(state, index))
    }

    fn pick_weighted(state: &RotatorState) -> Option<usize> {
        let candidates: Vec<usize> = (0..state.slots.len())
            .filter(|&index| Self::is_candidate(state, index))
            .collect();
        let total: u64 = candidates
            .iter()
            .map(|&index| state.slots[index].weight as u64)
            .sum();
        if total == 0 {
            return None;
        }

        let mut roll = rand::random_range(0..total);
        for index in candidates {
            let weight = state.slots[index].weight as u64;
            if roll < weight {
                return Some(index);
            }
            roll -= weight;
        }
        None
    }

    /// 报告身份失败（被封禁或连接失败）
    ///
    /// 连续失败达到阈值后该身份被停用
    pub fn report_failure(&self, identity: &Identity) {
        let mut state = self.state.lock();
        let max_failures = self.max_failures;
        if let Some(slot) = state.slots.iter_mut().find(|s| &s.identity == identity) {
            slot.failures += 1;
            if max_failures > 0 && slot.failures >= max_failures && slot.enabled {
                slot.enabled = false;
                warn!(
                    "Identity {} disabled after {} consecutive failures",
                    identity, slot.failures
                );
            }
        }
    }

    /// 报告身份成功，重置失败计数
    pub fn report_success(&self, identity: &Identity) {
        let mut state = self.state.lock();
        if let Some(slot) = state.slots.iter_mut().find(|s| &s.identity == identity) {
            slot.failures = 0;
        }
    }

    /// 总选择次数
    pub fn selections(&self) -> u64 {
        self.state.lock().selections
    }

    /// 可用身份数量
    pub fn enabled_len(&self) -> usize {
        self.state.lock().slots.iter().filter(|s| s.enabled).count()
    }

    pub fn pool_len(&self) -> usize {
        self.state.lock().slots.len()
    }
}
