// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;

/// 验证码和封禁页面的特征
static BLOCK_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(g-recaptcha|h-captcha|cf-challenge|captcha|access denied|too many requests|ip has been blocked|rate limit exceeded)",
    )
    .expect("block marker pattern is valid")
});

/// 判断响应是否表示被封禁
///
/// # 参数
///
/// * `status` - HTTP状态码
/// * `body` - 响应内容
///
/// # 返回值
///
/// 被封禁时返回原因，否则返回None。503 属于临时性错误，不视为封禁。
pub fn detect_block(status: u16, body: &str) -> Option<String> {
    match status {
        403 => return Some("HTTP 403 Forbidden".to_string()),
        429 => return Some("HTTP 429 Too Many Requests".to_string()),
        _ => {}
    }

    BLOCK_MARKERS
        .find(body)
        .map(|m| format!("block marker '{}' in page", m.as_str().to_lowercase()))
}
