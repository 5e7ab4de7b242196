// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供日志初始化、重试策略与URL辅助函数
pub mod retry_policy;
pub mod telemetry;
pub mod url_utils;
