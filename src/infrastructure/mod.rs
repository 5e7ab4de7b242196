// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，负责与外部系统的交互。
///
/// 包含的子模块：
/// - 数据库（database）：SQLite 连接与实体映射
/// - git（git）：调用 git 命令行
/// - 提供方（providers）：cgit、GitHub、Gitee 目录适配器
/// - 仓库实现（repositories）：提供领域仓库接口的具体实现
/// - 存储（storage）：本地镜像目录布局与标记文件
pub mod database;
pub mod git;
pub mod providers;
pub mod repositories;
pub mod storage;
