use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 程序配置
///
/// 优先级：CLI 参数 > 环境变量 > TOML 配置文件 > 默认值
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 上游镜像列表（按顺序故障转移）
    pub mirrors: Vec<String>,
    /// 窗贴 PDF 地址
    pub document_url: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 每个镜像的最大尝试次数
    pub attempts_per_mirror: usize,
    /// 失败后重试前的等待时间（秒）
    pub failover_backoff_secs: u64,
    /// 同时检查的订单数量
    pub max_workers: usize,
    /// 持久化记录目录
    pub info_dir: PathBuf,
    /// 窗贴文件目录
    pub document_dir: PathBuf,
    /// 待投递邮件目录
    pub outbox_dir: PathBuf,
    /// 运行日志文件
    pub run_log_file: PathBuf,
    /// 表格导出地址（CSV），为空则不拉取新订单
    pub sheet_feed_url: Option<String>,
    /// 表格读取进度文件
    pub sheet_cursor_file: PathBuf,
    /// 发件人地址
    pub mail_from: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mirrors: vec![
                "http://wwwqa.cotus.ford.com".to_string(),
                "http://www.cotus.ford.com".to_string(),
                "http://www.ordertracking.ford.com".to_string(),
            ],
            document_url: "http://www.windowsticker.forddirect.com/windowsticker.pdf".to_string(),
            request_timeout_secs: 5,
            attempts_per_mirror: 3,
            failover_backoff_secs: 3,
            max_workers: 10,
            info_dir: PathBuf::from("info"),
            document_dir: PathBuf::from("window_sticker"),
            outbox_dir: PathBuf::from("outbox"),
            run_log_file: PathBuf::from("logs.log"),
            sheet_feed_url: None,
            sheet_cursor_file: PathBuf::from("google_sheet.log"),
            mail_from: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            })?;
        Ok(config)
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖当前配置
    pub fn with_env_overrides(self) -> Self {
        let base = self;
        Self {
            mirrors: std::env::var("ORDER_WATCH_MIRRORS")
                .ok()
                .map(|v| split_list(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or(base.mirrors),
            document_url: std::env::var("ORDER_WATCH_DOCUMENT_URL").unwrap_or(base.document_url),
            request_timeout_secs: std::env::var("ORDER_WATCH_REQUEST_TIMEOUT").ok().and_then(|v| v.parse().ok()).unwrap_or(base.request_timeout_secs),
            attempts_per_mirror: std::env::var("ORDER_WATCH_ATTEMPTS_PER_MIRROR").ok().and_then(|v| v.parse().ok()).unwrap_or(base.attempts_per_mirror),
            failover_backoff_secs: std::env::var("ORDER_WATCH_BACKOFF").ok().and_then(|v| v.parse().ok()).unwrap_or(base.failover_backoff_secs),
            max_workers: std::env::var("ORDER_WATCH_MAX_WORKERS").ok().and_then(|v| v.parse().ok()).unwrap_or(base.max_workers),
            info_dir: std::env::var("ORDER_WATCH_INFO_DIR").map(PathBuf::from).unwrap_or(base.info_dir),
            document_dir: std::env::var("ORDER_WATCH_DOCUMENT_DIR").map(PathBuf::from).unwrap_or(base.document_dir),
            outbox_dir: std::env::var("ORDER_WATCH_OUTBOX_DIR").map(PathBuf::from).unwrap_or(base.outbox_dir),
            run_log_file: std::env::var("ORDER_WATCH_RUN_LOG").map(PathBuf::from).unwrap_or(base.run_log_file),
            sheet_feed_url: std::env::var("ORDER_WATCH_SHEET_URL").ok().or(base.sheet_feed_url),
            sheet_cursor_file: std::env::var("ORDER_WATCH_SHEET_CURSOR").map(PathBuf::from).unwrap_or(base.sheet_cursor_file),
            mail_from: std::env::var("ORDER_WATCH_MAIL_FROM").ok().or(base.mail_from),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(base.verbose_logging),
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> AppResult<()> {
        if self.mirrors.is_empty() {
            return Err(ConfigError::NoMirrors.into());
        }
        if self.attempts_per_mirror == 0 {
            return Err(invalid("attempts_per_mirror", "0"));
        }
        if self.max_workers == 0 {
            return Err(invalid("max_workers", "0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn failover_backoff(&self) -> Duration {
        Duration::from_secs(self.failover_backoff_secs)
    }
}

fn invalid(key: &str, value: &str) -> crate::error::AppError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mirrors.len(), 3);
        assert_eq!(config.max_workers, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_toml_partial_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order-watch.toml");
        std::fs::write(
            &path,
            "mirrors = [\"http://a.example\", \"http://b.example\"]\nmax_workers = 4\n",
        )
        .unwrap();

        let config = Config::from_toml_file(&path).unwrap();
        assert_eq!(config.mirrors, vec!["http://a.example", "http://b.example"]);
        assert_eq!(config.max_workers, 4);
        // 未写的字段保持默认
        assert_eq!(config.attempts_per_mirror, 3);
    }

    #[test]
    fn test_empty_mirrors_rejected() {
        let config = Config {
            mirrors: Vec::new(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(crate::error::AppError::Config(ConfigError::NoMirrors))
        ));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a , b,,c "), vec!["a", "b", "c"]);
    }
}
