// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use rand::seq::SliceRandom;
use serde::Deserialize;
use std::time::Duration;
use tracing::trace;

use crate::config::settings::PacingSettings;

/// 延迟分布
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DelayDistribution {
    /// 对数正态分布，中位数为上下界的几何平均
    #[default]
    LogNormal,
    /// 均匀分布
    Uniform,
}

/// 人类节奏模拟器
///
/// 在每次抓取前插入随机延迟，并打乱请求顺序，以避免触发反爬虫机制。
/// 只是近似的人类节奏，不提供实时性保证。
#[derive(Debug, Clone)]
pub struct HumanPacer {
    enabled: bool,
    min: Duration,
    max: Duration,
    distribution: DelayDistribution,
}

impl HumanPacer {
    /// 创建新的节奏模拟器
    ///
    /// 下界至少为 1 毫秒；上下界颠倒时自动交换
    pub fn new(enabled: bool, min: Duration, max: Duration, distribution: DelayDistribution) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let min = min.max(Duration::from_millis(1));
        let max = max.max(min);
        Self {
            enabled,
            min,
            max,
            distribution,
        }
    }

    /// 关闭的模拟器，`delay()` 立即返回
    pub fn disabled() -> Self {
        Self::new(
            false,
            Duration::from_millis(1),
            Duration::from_millis(1),
            DelayDistribution::Uniform,
        )
    }

    pub fn from_settings(settings: &PacingSettings, simulate_human: bool) -> Self {
        Self::new(
            simulate_human,
            Duration::from_millis(settings.min_delay_ms),
            Duration::from_millis(settings.max_delay_ms),
            settings.distribution,
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 采样一次延迟时长，关闭时为零
    pub fn sample(&self) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }

        let min_ms = self.min.as_secs_f64() * 1000.0;
        let max_ms = self.max.as_secs_f64() * 1000.0;
        if max_ms <= min_ms {
            return self.min;
        }

        let ms = match self.distribution {
            DelayDistribution::Uniform => rand::random_range(min_ms..=max_ms),
            DelayDistribution::LogNormal => {
                let mu = (min_ms.ln() + max_ms.ln()) / 2.0;
                // ~95% of the mass falls inside the bounds before clamping
                let sigma = (max_ms.ln() - min_ms.ln()) / 4.0;
                (mu + sigma * standard_normal()).exp()
            }
        };

        Duration::from_secs_f64(ms.clamp(min_ms, max_ms) / 1000.0)
    }

    /// 阻塞当前流程一段随机时长，返回实际等待时间
    pub async fn delay(&self) -> Duration {
        let pause = self.sample();
        if !pause.is_zero() {
            trace!("Pacing pause of {:?}", pause);
            tokio::time::sleep(pause).await;
        }
        pause
    }

    /// 打乱请求顺序
    pub fn shuffle<T>(&self, items: &mut [T]) {
        if self.enabled {
            items.shuffle(&mut rand::rng());
        }
    }
}

/// Box-Muller 变换
fn standard_normal() -> f64 {
    let u1: f64 = rand::random_range(f64::EPSILON..1.0);
    let u2: f64 = rand::random_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
