// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 爬取服务（crawl_service）：按数据源枚举并补全仓库
/// - 对账服务（reconcile_service）：以克隆地址为身份键把草稿合入存储
/// - 镜像服务（mirror_service）：同步本地裸仓库并生成 cgitrc
pub mod crawl_service;
pub mod mirror_service;
pub mod reconcile_service;
