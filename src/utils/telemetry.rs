// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,gitmirror=debug";

/// 初始化日志订阅器
///
/// 优先使用显式传入的过滤规则，其次是 `RUST_LOG`，最后是默认规则
pub fn init_telemetry(level: Option<&str>) {
    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

fn build_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| DEFAULT_FILTER.into()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_level_is_used() {
        let filter = build_filter(Some("warn"));
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn test_invalid_level_falls_back_to_default() {
        let filter = build_filter(Some("gitmirror=loudest"));
        assert!(filter.to_string().contains("gitmirror=debug"));
    }
}
