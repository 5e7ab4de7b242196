// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：数据源、仓库记录与运行报告
/// - 提供方接口（providers）：目录爬取适配器的能力定义
/// - 仓库接口（repositories）：数据持久化抽象接口
/// - 服务（services）：爬取、对账与镜像
pub mod models;
pub mod providers;
pub mod repositories;
pub mod services;
