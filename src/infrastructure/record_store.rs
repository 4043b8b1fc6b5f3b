//! 持久化记录存储 - 基础设施层
//!
//! 引擎只依赖 `RecordStore` 的 load / save，文件实现可以整体换成嵌入式数据库

use crate::error::{AppError, AppResult, StoreError};
use crate::infrastructure::atomic_file::write_atomic;
use crate::models::{PersistedRecord, SubjectKey};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, warn};

/// 每个跟踪对象一条记录的键值存储
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 读取记录，首次检查时返回 None
    async fn load(&self, key: &SubjectKey) -> AppResult<Option<PersistedRecord>>;

    /// 整条记录原子写回
    async fn save(&self, key: &SubjectKey, record: &PersistedRecord) -> AppResult<()>;
}

/// 一个 JSON 文件一条记录：`<dir>/<订单标识>_<email>.json`
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 确保目录存在
    pub async fn ensure_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::store_write_failed(&self.dir, e))
    }

    pub fn path_for(&self, key: &SubjectKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.file_stem()))
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn load(&self, key: &SubjectKey) -> AppResult<Option<PersistedRecord>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::store_read_failed(&path, e)),
        };

        match serde_json::from_str::<PersistedRecord>(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // 损坏的记录按首次检查处理
                warn!("记录文件损坏，按首次检查处理 {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &SubjectKey, record: &PersistedRecord) -> AppResult<()> {
        let path = self.path_for(key);
        let bytes = serde_json::to_vec_pretty(record).map_err(StoreError::Encode)?;
        write_atomic(&path, bytes)
            .await
            .map_err(|e| AppError::store_write_failed(&path, e))?;
        debug!("记录已保存: {}", path.display());
        Ok(())
    }
}
