// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::Path;
use tracing::warn;

/// 提供方 API 凭据
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("token", &"***")
            .finish()
    }
}

impl Credentials {
    /// 解析 `user:token` 形式的文本
    pub fn parse(text: &str) -> Option<Self> {
        let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
        let (user, token) = line.split_once(':')?;
        let (user, token) = (user.trim(), token.trim());
        if user.is_empty() || token.is_empty() {
            return None;
        }
        Some(Self {
            user: user.to_string(),
            token: token.to_string(),
        })
    }

    /// 从令牌文件读取凭据
    ///
    /// 文件缺失或格式错误时返回 `None`，以匿名方式访问
    pub fn from_file(path: &Path) -> Option<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Token file {} unavailable: {}", path.display(), e);
                return None;
            }
        };
        let credentials = Self::parse(&text);
        if credentials.is_none() {
            warn!("Token file {} is malformed, expected user:token", path.display());
        }
        credentials
    }
}
