//! HTTP 传输 - 基础设施层
//!
//! 持有唯一的 reqwest::Client，只暴露"发一次 GET"的能力，不做重试

use crate::error::{AppError, AppResult, FetchError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// 一次 GET 请求的能力
///
/// 镜像抓取和文档抓取都只依赖这个 trait，测试中可以替换成脚本化的假实现
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// 发送一次 GET 请求，返回响应体
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<Vec<u8>, FetchError>;
}

/// 基于 reqwest 的 HTTP 执行器
///
/// 职责：
/// - 持有唯一的 Client（内部连接池）
/// - 把超时、连接失败、非 2xx 状态统一映射为 `FetchError`
/// - 不认识订单，不处理重试
pub struct HttpExecutor {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpExecutor {
    /// 创建新的 HTTP 执行器
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::transport("reqwest::Client", e))?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::NetworkTimeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source: Box::new(err),
            }
        }
    }
}

#[async_trait]
impl HttpTransport for HttpExecutor {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<Vec<u8>, FetchError> {
        debug!("GET {} ({} 个参数)", url, query.len());

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify(url, e))?;
        debug!("GET {} 完成, {} 字节", url, body.len());
        Ok(body.to_vec())
    }
}
