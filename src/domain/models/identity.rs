// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 请求身份
///
/// User-Agent 与代理地址的组合，用于掩盖请求来源。只会被选择，不会被修改。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// User-Agent 字符串
    pub user_agent: String,
    /// 代理地址 (URL)，None 表示直连
    pub proxy: Option<String>,
}

impl Identity {
    pub fn new(user_agent: impl Into<String>, proxy: Option<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            proxy,
        }
    }

    /// 由 User-Agent 和代理列表构建身份池
    ///
    /// 池大小为两者长度的较大值，第 i 个身份取 `ua[i % ua_len]` 与 `proxy[i % proxy_len]`
    pub fn build_pool(user_agents: &[String], proxies: &[String]) -> Vec<Identity> {
        if user_agents.is_empty() {
            return Vec::new();
        }
        if proxies.is_empty() {
            return user_agents
                .iter()
                .map(|ua| Identity::new(ua.clone(), None))
                .collect();
        }

        let size = user_agents.len().max(proxies.len());
        (0..size)
            .map(|i| {
                Identity::new(
                    user_agents[i % user_agents.len()].clone(),
                    Some(proxies[i % proxies.len()].clone()),
                )
            })
            .collect()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // UA strings are long; the first token is enough for logs
        let agent = self.user_agent.split_whitespace().next().unwrap_or("");
        match &self.proxy {
            Some(proxy) => write!(f, "{} via {}", agent, proxy),
            None => write!(f, "{} direct", agent),
        }
    }
}
