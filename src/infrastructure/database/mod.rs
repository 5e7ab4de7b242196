// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库模块
///
/// 提供服务数据库连接和实体管理功能
/// 每个服务对应一个 SQLite 文件
pub mod connection;
pub mod entities;
