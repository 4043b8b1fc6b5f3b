//! 窗贴文档服务 - 业务能力层
//!
//! 下载订单的窗贴 PDF，与本地副本按内容哈希比较，判定首次发布 / 未变化 / 已更新 / 未找到

use crate::clients::{MirrorFetcher, RetryPolicy};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{write_atomic, HttpTransport};
use crate::models::SubjectKey;
use regex::bytes::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 占位文档的标题不是这个
const EXPECTED_TITLE: &str = "windowsticker";

/// 文档下载结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocOutcome {
    /// 远端没有（或只有占位文档），且本地也没有
    NotFoundRemote,
    /// 与本地副本一致，或远端暂时不可达但本地已有
    FoundBefore,
    /// 首次拿到
    Released,
    /// 内容有变化，已替换本地副本
    Updated,
}

impl DocOutcome {
    pub fn label(self) -> &'static str {
        match self {
            DocOutcome::NotFoundRemote => "NOT FOUND",
            DocOutcome::FoundBefore => "FOUND BEFORE",
            DocOutcome::Released => "RELEASED",
            DocOutcome::Updated => "UPDATED",
        }
    }
}

impl std::fmt::Display for DocOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 窗贴文档服务
///
/// 职责：
/// - 每个跟踪对象一个本地文件 `<dir>/<订单标识>_<email>.pdf`
/// - 新内容校验通过后先落到同目录的临时文件，再原子改名覆盖，任何时刻都不会没有副本
/// - 不关心通知流程
pub struct DocumentService {
    fetcher: MirrorFetcher,
    dir: PathBuf,
    title: Regex,
}

impl DocumentService {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        url: impl Into<String>,
        attempts: usize,
        timeout: Duration,
        dir: impl Into<PathBuf>,
    ) -> AppResult<Self> {
        let title = Regex::new(r"/Title\s*\(([^)]*)\)")
            .map_err(|e| AppError::Other(format!("正则编译失败: {}", e)))?;
        Ok(Self {
            fetcher: MirrorFetcher::new(transport, RetryPolicy::single(url, attempts, timeout)),
            dir: dir.into(),
            title,
        })
    }

    pub fn path_for(&self, key: &SubjectKey) -> PathBuf {
        self.dir.join(format!("{}.pdf", key.file_stem()))
    }

    /// 本地是否已有该对象的文档
    pub fn exists_locally(&self, key: &SubjectKey) -> bool {
        self.path_for(key).is_file()
    }

    /// 下载并去重，`vin` 是远端查询用的车架号
    pub async fn fetch_document(&self, key: &SubjectKey, vin: &str) -> AppResult<DocOutcome> {
        let live = self.path_for(key);
        let old_hash = hash_file(&live).await?;

        let query = vec![("vin".to_string(), vin.to_string())];
        let bytes = match self.fetcher.fetch(&query).await {
            Ok(fetched) => fetched.value,
            Err(e) => {
                warn!("[{}] 窗贴下载失败: {}", key, e);
                return Ok(if old_hash.is_some() {
                    DocOutcome::FoundBefore
                } else {
                    DocOutcome::NotFoundRemote
                });
            }
        };

        if !self.is_expected_document(&bytes) {
            debug!("[{}] 远端返回的是占位文档", key);
            return Ok(DocOutcome::NotFoundRemote);
        }

        let new_hash = hash_bytes(&bytes);
        let outcome = match old_hash {
            None => DocOutcome::Released,
            Some(old) if old != new_hash => DocOutcome::Updated,
            Some(_) => return Ok(DocOutcome::FoundBefore),
        };

        write_atomic(&live, bytes)
            .await
            .map_err(|e| AppError::document_io(&live, e))?;
        info!("[{}] 窗贴 {}: {}", key, outcome, live.display());
        Ok(outcome)
    }

    /// 轻量校验：是 PDF 且标题（去空白、小写）为 windowsticker
    pub fn is_expected_document(&self, bytes: &[u8]) -> bool {
        if !bytes.starts_with(b"%PDF-") {
            return false;
        }
        self.title
            .captures(bytes)
            .and_then(|c| c.get(1))
            .map(|m| {
                String::from_utf8_lossy(m.as_bytes())
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_lowercase()
            })
            .is_some_and(|title| title == EXPECTED_TITLE)
    }
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

async fn hash_file(path: &Path) -> AppResult<Option<String>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(hash_bytes(&bytes))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::document_io(path, e)),
    }
}
