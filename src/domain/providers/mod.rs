// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 目录提供方模块
///
/// 定义爬取适配器的能力接口，具体实现位于基础设施层
pub mod provider;
