use std::path::Path;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 上游抓取错误
    #[error("上游错误: {0}")]
    Fetch(#[from] FetchError),
    /// 持久化记录错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 附属文档错误
    #[error("文档错误: {0}")]
    Document(#[from] DocumentError),
    /// 通知发送错误
    #[error("通知错误: {0}")]
    Dispatch(#[from] DispatchError),
    /// 输入错误（订单列表 / 临时查询参数）
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 上游抓取错误
#[derive(Debug, Error)]
pub enum FetchError {
    /// 单次请求超时
    #[error("请求超时 ({url}), 超时时间 {timeout_ms}ms")]
    NetworkTimeout { url: String, timeout_ms: u64 },
    /// 连接失败等传输层错误
    #[error("请求失败 ({url}): {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 上游返回非 2xx 状态码
    #[error("上游返回错误状态 ({url}): {status}")]
    HttpStatus { url: String, status: u16 },
    /// 所有镜像均已耗尽
    #[error("数据源不可用: {mirrors} 个镜像共尝试 {attempts} 次均失败")]
    SourceUnavailable { mirrors: usize, attempts: usize },
}

impl FetchError {
    /// 是否为"全部镜像耗尽"，调用方据此区分"网络不通"与"订单不存在"
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, FetchError::SourceUnavailable { .. })
    }
}

/// 持久化记录错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("读取记录失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入记录失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("记录序列化失败: {0}")]
    Encode(#[source] serde_json::Error),
}

/// 附属文档错误
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("文档文件操作失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 通知发送错误
///
/// `InvalidAddress` 与 `Transport` 必须区分开：前者是收件人问题，后者才是可重试的发送失败
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("无效的邮箱地址: {address}")]
    InvalidAddress { address: String },
    #[error("发件人未配置")]
    NotConfigured,
    #[error("发送失败: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 输入错误
#[derive(Debug, Error)]
pub enum InputError {
    #[error("无效订单 '{line}': {reason}")]
    MalformedLine { line: String, reason: String },
    #[error("订单列表文件不存在: {path}")]
    ListNotFound { path: String },
    #[error("无效的查询参数: {reason}")]
    InvalidQuery { reason: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("至少需要配置一个上游镜像")]
    NoMirrors,
    #[error("配置项 {key} 的值无效: {value}")]
    InvalidValue { key: String, value: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建传输层错误
    pub fn transport(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Fetch(FetchError::Transport {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建记录读取错误
    pub fn store_read_failed(path: &Path, source: std::io::Error) -> Self {
        AppError::Store(StoreError::ReadFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 创建记录写入错误
    pub fn store_write_failed(path: &Path, source: std::io::Error) -> Self {
        AppError::Store(StoreError::WriteFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 创建文档文件错误
    pub fn document_io(path: &Path, source: std::io::Error) -> Self {
        AppError::Document(DocumentError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
