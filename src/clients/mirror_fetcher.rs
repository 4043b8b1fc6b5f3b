/// 镜像抓取客户端
///
/// 按顺序在多个等价镜像之间故障转移，每个镜像有固定的尝试次数
use crate::config::Config;
use crate::error::FetchError;
use crate::infrastructure::HttpTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// 带故障转移的有限重试策略
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 按顺序尝试的镜像，不能为空
    pub mirrors: Vec<String>,
    /// 每个镜像的尝试次数
    pub attempts_per_mirror: usize,
    /// 单次尝试的超时
    pub attempt_timeout: Duration,
    /// 失败后再次尝试前的等待
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mirrors: config.mirrors.clone(),
            attempts_per_mirror: config.attempts_per_mirror,
            attempt_timeout: config.request_timeout(),
            backoff: config.failover_backoff(),
        }
    }

    /// 单一地址、不等待的策略（用于附属文档下载）
    pub fn single(url: impl Into<String>, attempts: usize, attempt_timeout: Duration) -> Self {
        Self {
            mirrors: vec![url.into()],
            attempts_per_mirror: attempts,
            attempt_timeout,
            backoff: Duration::ZERO,
        }
    }
}

/// 调用方对一次成功响应的判定
pub enum Attempt<T> {
    /// 接受结果，结束抓取
    Accept(T),
    /// 响应内容表明数据源降级，按失败计入并继续重试
    Retry(String),
}

/// 抓取成功的结果，附带实际命中的镜像
#[derive(Debug)]
pub struct Fetched<T> {
    pub value: T,
    pub mirror: String,
    /// 包括成功那次在内的总尝试次数
    pub attempts: usize,
}

/// 镜像抓取器
pub struct MirrorFetcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl MirrorFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// 抓取一次，返回第一个成功的响应体
    ///
    /// 全部镜像耗尽时返回 `FetchError::SourceUnavailable`
    pub async fn fetch(&self, query: &[(String, String)]) -> Result<Fetched<Vec<u8>>, FetchError> {
        self.fetch_with(query, Attempt::Accept).await
    }

    /// 抓取并由调用方判定响应是否可用
    ///
    /// 同一镜像上失败会重试同一镜像，耗尽后才切到下一个镜像；每次失败之后、下一次尝试之前等待 `backoff`
    pub async fn fetch_with<T, F>(
        &self,
        query: &[(String, String)],
        mut accept: F,
    ) -> Result<Fetched<T>, FetchError>
    where
        F: FnMut(Vec<u8>) -> Attempt<T>,
    {
        let total_budget = self.policy.mirrors.len() * self.policy.attempts_per_mirror;
        let mut attempts = 0;

        for mirror in &self.policy.mirrors {
            for attempt in 1..=self.policy.attempts_per_mirror {
                attempts += 1;
                debug!(
                    "请求 {} (第 {}/{} 次)",
                    mirror, attempt, self.policy.attempts_per_mirror
                );

                match timeout(self.policy.attempt_timeout, self.transport.get(mirror, query)).await
                {
                    Ok(Ok(body)) => match accept(body) {
                        Attempt::Accept(value) => {
                            return Ok(Fetched {
                                value,
                                mirror: mirror.clone(),
                                attempts,
                            });
                        }
                        Attempt::Retry(reason) => {
                            warn!("⚠️ {} 响应不可用: {}", mirror, reason);
                        }
                    },
                    Ok(Err(e)) => {
                        warn!("⚠️ {} 请求失败: {}", mirror, e);
                    }
                    Err(_) => {
                        warn!(
                            "⚠️ {} 请求超时 ({}ms)",
                            mirror,
                            self.policy.attempt_timeout.as_millis()
                        );
                    }
                }

                if attempts < total_budget && !self.policy.backoff.is_zero() {
                    sleep(self.policy.backoff).await;
                }
            }
            info!("镜像 {} 已尝试 {} 次，切换到下一个镜像", mirror, self.policy.attempts_per_mirror);
        }

        Err(FetchError::SourceUnavailable {
            mirrors: self.policy.mirrors.len(),
            attempts,
        })
    }
}
