// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 数据源（source）：待爬取的目录及其排除规则与目标
/// - 仓库（repository）：存储记录与爬取中的草稿
/// - 服务配置（configuration）：每个服务唯一的配置行
/// - 运行报告（report）：爬取与镜像过程中的失败记录
pub mod configuration;
pub mod report;
pub mod repository;
pub mod source;
