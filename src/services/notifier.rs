//! 通知发送服务 - 业务能力层
//!
//! 只负责"把一封邮件交出去"，成功与否如实上报，不关心流程

use crate::error::{AppError, DispatchError};
use crate::infrastructure::write_atomic;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

const SUBJECT_PREFIX: &str = "[ORDER WATCH]";
const BOUNDARY: &str = "order-watch-boundary";

/// 邮件附件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// 一封待发送的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl Notification {
    /// 订单信息无效的提醒
    pub fn invalid_order(to: &str, info: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: format!("{} Invalid Information", SUBJECT_PREFIX),
            body: format!(
                "The information you entered is invalid.\n\
                 Please make sure it works on the order tracking website before you register with the auto checker.\n\n\
                 The information you entered: {}",
                info
            ),
            attachments: Vec::new(),
        }
    }

    /// 新订单登记成功的确认
    pub fn new_order(to: &str, info: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: format!("{} New Order Registered", SUBJECT_PREFIX),
            body: format!(
                "Your order has been registered with the auto checker.\n\n\
                 The information you entered: {}",
                info
            ),
            attachments: Vec::new(),
        }
    }

    /// 订单状态变化通知的标题
    pub fn status_subject(vin: &str, initial: bool) -> String {
        if initial {
            format!(
                "{} Order Status Changed for VIN: {} (Initial Check)",
                SUBJECT_PREFIX, vin
            )
        } else {
            format!("{} Order Status Changed for VIN: {}", SUBJECT_PREFIX, vin)
        }
    }
}

/// 通知发送能力
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// 把邮件写入发件箱目录，由外部中继负责真正投递
///
/// 每封邮件一个 `.eml` 文件，先写临时文件再改名，中继不会读到半封邮件
pub struct OutboxDispatcher {
    from: Option<String>,
    dir: PathBuf,
    address: Regex,
    sequence: AtomicU64,
}

impl OutboxDispatcher {
    pub fn new(from: Option<String>, dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let address = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
            .map_err(|e| AppError::Other(format!("正则编译失败: {}", e)))?;
        Ok(Self {
            from,
            dir: dir.into(),
            address,
            sequence: AtomicU64::new(0),
        })
    }

    pub fn is_valid_address(&self, address: &str) -> bool {
        self.address.is_match(address)
    }

    fn render(&self, from: &str, notification: &Notification) -> String {
        let mut message = String::new();
        message.push_str(&format!("From: {}\r\n", from));
        message.push_str(&format!("To: {}\r\n", notification.to));
        message.push_str(&format!("Date: {}\r\n", chrono::Local::now().to_rfc2822()));
        message.push_str(&format!("Subject: {}\r\n", notification.subject));
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
            BOUNDARY
        ));

        message.push_str(&format!("--{}\r\n", BOUNDARY));
        message.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n\r\n");
        message.push_str(&notification.body);
        message.push_str("\r\n");

        for attachment in &notification.attachments {
            message.push_str(&format!("--{}\r\n", BOUNDARY));
            message.push_str("Content-Type: application/octet-stream\r\n");
            message.push_str(&format!(
                "Content-Disposition: attachment; filename=\"{}\"\r\n",
                attachment.filename
            ));
            message.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
            let encoded = STANDARD.encode(&attachment.content);
            for chunk in encoded.as_bytes().chunks(76) {
                message.push_str(&String::from_utf8_lossy(chunk));
                message.push_str("\r\n");
            }
        }
        message.push_str(&format!("--{}--\r\n", BOUNDARY));
        message
    }
}

#[async_trait]
impl NotificationDispatcher for OutboxDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        if !self.is_valid_address(&notification.to) {
            return Err(DispatchError::InvalidAddress {
                address: notification.to.clone(),
            });
        }
        let from = self.from.as_deref().ok_or(DispatchError::NotConfigured)?;

        let message = self.render(from, notification);
        let name = format!(
            "{}_{:06}_{}.eml",
            chrono::Local::now().format("%Y%m%d%H%M%S%3f"),
            self.sequence.fetch_add(1, Ordering::Relaxed),
            notification.to
        );
        let path = self.dir.join(name);

        write_atomic(&path, message.into_bytes())
            .await
            .map_err(|e| DispatchError::Transport { source: Box::new(e) })?;

        debug!("邮件已写入发件箱: {}", path.display());
        info!("📧 通知已发送: {} -> {}", notification.subject, notification.to);
        Ok(())
    }
}
