// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 用例模块
///
/// 服务管理：创建、删除、爬取、镜像与导出
pub mod service_use_case;
