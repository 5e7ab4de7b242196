// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 目录提供方实现
///
/// 包括 cgit 网页目录与 GitHub、Gitee 的 REST 接口
pub mod cgit;
pub mod gitee;
pub mod github;
pub mod registry;
pub mod rest_api;

pub use registry::ProviderRegistry;
