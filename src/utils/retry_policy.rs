// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

/// 重试策略配置
///
/// 目录站点与 API 的下载失败按固定间隔重试，次数不含首次请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大重试次数
    pub max_retries: u32,
    /// 两次尝试之间的等待时间
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(3))
    }
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }

    /// 第 `attempt` 次重试前的等待时间
    pub fn calculate_backoff(&self, _attempt: u32) -> Duration {
        self.interval
    }

    /// 已经重试 `attempt` 次后是否还能继续
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policy_has_constant_backoff() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(250));

        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(250));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(250));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::fixed(2, Duration::ZERO);

        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
        assert!(!RetryPolicy::fixed(0, Duration::ZERO).should_retry(0));
    }
}
