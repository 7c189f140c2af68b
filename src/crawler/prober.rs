use std::time::Duration;

use http::{HeaderMap, StatusCode, header};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// 候选地址不算作图片的原因
#[derive(Debug, Error)]
pub enum ProbeMiss {
    #[error("请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("状态码 {0}")]
    Status(StatusCode),
    #[error("不是图片类型: {0:?}")]
    ContentType(Option<String>),
    #[error("没有有效的 Content-Length")]
    EmptyBody,
}

/// 只发 HEAD 请求判断候选图片是否存在
#[derive(Clone)]
pub struct Prober {
    client: Client,
    timeout: Duration,
}

impl Prober {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// 成功时返回声明的字节数
    pub async fn probe(&self, url: &Url) -> Result<u64, ProbeMiss> {
        let response = self
            .client
            .head(url.clone())
            .timeout(self.timeout)
            .send()
            .await?;
        check_head(response.status(), response.headers())
    }

    pub async fn exists(&self, url: &Url) -> bool {
        match self.probe(url).await {
            Ok(length) => {
                debug!("命中 {} ({} 字节)", url, length);
                true
            }
            Err(ProbeMiss::Network(e)) => {
                debug!("检查 {} 出错: {}", url, e);
                false
            }
            Err(miss) => {
                debug!("跳过 {}: {}", url, miss);
                false
            }
        }
    }
}

pub fn check_head(status: StatusCode, headers: &HeaderMap) -> Result<u64, ProbeMiss> {
    if !status.is_success() {
        return Err(ProbeMiss::Status(status));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase());
    match &content_type {
        Some(ct) if ct.trim_start().starts_with("image/") => {}
        _ => return Err(ProbeMiss::ContentType(content_type)),
    }

    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&length| length > 0)
        .ok_or(ProbeMiss::EmptyBody)
}
