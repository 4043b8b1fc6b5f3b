use crate::models::order::{OrderDescriptor, OrderKey};
use crate::models::snapshot::LifecycleState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 每个跟踪对象的持久化记录
///
/// 完成标记只在对应的外部动作成功之后置 true。
/// 新欠下的通知发送失败时 `notification_sent` 回到 false，变化留在 pending 里下一轮重发
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub edd: String,
    pub state: LifecycleState,
    #[serde(default)]
    pub notification_sent: bool,
    #[serde(default)]
    pub initial_notification_sent: bool,
    #[serde(default)]
    pub document_delivered: bool,
    /// 上次检测到但尚未成功通知的 EDD 变化
    #[serde(default)]
    pub edd_changed_pending: bool,
    /// 上次检测到但尚未成功通知的状态变化
    #[serde(default)]
    pub state_changed_pending: bool,
    #[serde(default)]
    pub vehicle_name: String,
    pub checked_at: DateTime<Utc>,
}

/// 持久化记录的键：订单标识 + 邮箱，与登记时去重用的身份一致
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectKey {
    /// VIN，或 `<订单号>_<经销商代码>`
    pub order: String,
    pub email: Option<String>,
}

impl SubjectKey {
    pub fn new(order: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            order: order.into(),
            email: email.map(str::to_string),
        }
    }

    pub fn for_descriptor(descriptor: &OrderDescriptor) -> Self {
        let order = match &descriptor.key {
            OrderKey::Vin(vin) => vin.clone(),
            OrderKey::NumberAndDealer {
                order_number,
                dealer_code,
            } => format!("{}_{}", order_number, dealer_code),
        };
        Self::new(order, descriptor.email.as_deref())
    }

    /// 文件名主干，如 `1FTEW1EG0HFA12345_a@b.com`
    pub fn file_stem(&self) -> String {
        match &self.email {
            Some(email) => format!("{}_{}", self.order, email),
            None => self.order.clone(),
        }
    }
}

impl std::fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}
