// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 服务端错误
    #[error("Server error: HTTP {0}")]
    ServerError(u16),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl EngineError {
    /// 判断错误是否可重试
    ///
    /// 传输层错误与 5xx 可重试，其余直接返回
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::RequestFailed(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            EngineError::ServerError(_) | EngineError::Timeout => true,
            EngineError::Other(_) => false,
        }
    }
}

/// 期望的文档类型
///
/// 由提供方决定，不做内容嗅探
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Json,
}

/// 下载请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 目标URL
    pub url: String,
    pub kind: DocumentKind,
}

impl FetchRequest {
    pub fn html(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: DocumentKind::Html,
        }
    }

    pub fn json(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: DocumentKind::Json,
        }
    }
}

/// 下载响应
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP状态码
    pub status_code: u16,
    /// 响应内容
    pub content: String,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// 下载特质
///
/// 爬取过程唯一的网络出口，测试中可替换
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// 下载文档，失败时已完成有限次重试
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
