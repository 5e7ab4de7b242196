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

use crate::config::settings::CrawlerSettings;
use crate::engines::credentials::Credentials;
use crate::engines::traits::{DocumentKind, EngineError, FetchRequest, FetchResponse, Fetcher};
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::url_utils::host_of;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Instant;
use tracing::{debug, warn};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// 凭据的附加方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStyle {
    /// HTTP basic 认证
    Basic,
    /// `access_token` 查询参数
    AccessToken,
}

/// 按主机注册的提供方 API
#[derive(Debug, Clone)]
struct ApiHost {
    host: String,
    style: AuthStyle,
    credentials: Option<Credentials>,
}

/// 下载引擎
///
/// 基于reqwest实现，带固定间隔重试与提供方认证
pub struct ReqwestEngine {
    client: reqwest::Client,
    retry: RetryPolicy,
    api_hosts: Vec<ApiHost>,
}

impl ReqwestEngine {
    /// 根据爬取配置创建引擎
    ///
    /// 凭据文件在此处读取一次，缺失时以匿名方式访问
    pub fn new(settings: &CrawlerSettings) -> Result<Self, EngineError> {
        let github = settings
            .github_token_file
            .as_deref()
            .and_then(Credentials::from_file);
        let gitee = settings
            .gitee_token_file
            .as_deref()
            .and_then(Credentials::from_file);
        Self::with_credentials(settings, github, gitee)
    }

    /// 使用显式凭据创建引擎
    pub fn with_credentials(
        settings: &CrawlerSettings,
        github: Option<Credentials>,
        gitee: Option<Credentials>,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.read_timeout())
            .build()?;

        let mut api_hosts = Vec::new();
        if let Some(host) = host_of(&settings.github_api) {
            api_hosts.push(ApiHost {
                host,
                style: AuthStyle::Basic,
                credentials: github,
            });
        }
        if let Some(host) = host_of(&settings.gitee_api) {
            api_hosts.push(ApiHost {
                host,
                style: AuthStyle::AccessToken,
                credentials: gitee,
            });
        }

        Ok(Self {
            client,
            retry: RetryPolicy::fixed(settings.retry_times, settings.retry_interval()),
            api_hosts,
        })
    }

    fn api_host_for(&self, url: &str) -> Option<&ApiHost> {
        let host = host_of(url)?;
        self.api_hosts.iter().find(|api| api.host == host)
    }

    async fn fetch_once(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let api = self.api_host_for(&request.url);
        let mut builder = self.client.get(&request.url);

        if request.kind == DocumentKind::Json {
            let accept = match api.map(|a| a.style) {
                Some(AuthStyle::Basic) => GITHUB_ACCEPT,
                _ => "application/json",
            };
            builder = builder.header(ACCEPT, accept);
        }

        if let Some(ApiHost {
            style,
            credentials: Some(creds),
            ..
        }) = api
        {
            builder = match style {
                AuthStyle::Basic => builder.basic_auth(&creds.user, Some(&creds.token)),
                AuthStyle::AccessToken => builder.query(&[("access_token", creds.token.as_str())]),
            };
        }

        let start = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        if status.is_server_error() {
            return Err(EngineError::ServerError(status.as_u16()));
        }

        let content = response.text().await?;
        Ok(FetchResponse {
            status_code: status.as_u16(),
            content,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl Fetcher for ReqwestEngine {
    /// 执行HTTP下载
    ///
    /// 传输错误与 5xx 按固定间隔重试，4xx 响应体原样返回由提供方解释
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(request).await {
                Ok(response) => {
                    debug!(
                        "Fetched {} ({}) in {}ms",
                        request.url, response.status_code, response.response_time_ms
                    );
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && self.retry.should_retry(attempt) => {
                    attempt += 1;
                    let delay = self.retry.calculate_backoff(attempt);
                    warn!(
                        "Fetch {} failed (attempt {}): {}, retrying in {:?}",
                        request.url, attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
