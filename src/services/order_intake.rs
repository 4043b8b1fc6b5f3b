//! 订单登记服务 - 业务能力层
//!
//! 把订单列表和表格新订单合并成本轮要检查的去重列表

use crate::error::DispatchError;
use crate::models::OrderDescriptor;
use crate::services::notifier::{Notification, NotificationDispatcher};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 登记结果
#[derive(Debug, Default)]
pub struct IntakeReport {
    /// 去重后的订单，保持首次出现的顺序
    pub orders: Vec<OrderDescriptor>,
    /// 需要展示给用户的提示（无效订单 / 新订单）
    pub notices: Vec<String>,
    pub invalid: usize,
    pub added: usize,
}

/// 订单登记服务
///
/// 职责：
/// - 校验、规范化、按规范字符串去重
/// - 无效订单不终止整轮，只提示并尽量通知登记人
/// - 表格新订单跳过已存在的，新增的发送登记确认
pub struct OrderIntake {
    dispatcher: Option<Arc<dyn NotificationDispatcher>>,
}

impl OrderIntake {
    pub fn new(dispatcher: Option<Arc<dyn NotificationDispatcher>>) -> Self {
        Self { dispatcher }
    }

    pub async fn intake(&self, list_lines: &[String], feed_lines: &[String]) -> IntakeReport {
        let mut report = IntakeReport::default();
        let mut seen = HashSet::new();

        for line in list_lines {
            match OrderDescriptor::parse_line(line) {
                Ok(order) => {
                    if seen.insert(order.canonical()) {
                        report.orders.push(order);
                    } else {
                        debug!("重复订单已忽略: {}", order.canonical());
                    }
                }
                Err(e) => {
                    let info = describe_raw(line);
                    warn!("⚠️ {}", e);
                    report.notices.push(format!("{}\nInvalid Order.\n", info));
                    report.invalid += 1;
                    if let Some(address) = last_field(line) {
                        self.notify(Notification::invalid_order(&address, &info)).await;
                    }
                }
            }
        }

        for line in feed_lines {
            match OrderDescriptor::parse_line(line) {
                Ok(order) => {
                    if !seen.insert(order.canonical()) {
                        continue;
                    }
                    let info = order.info();
                    info!("✓ 新订单: {}", info);
                    report.notices.push(format!("{}\nNew Order.\n", info));
                    report.added += 1;
                    if let Some(address) = &order.email {
                        self.notify(Notification::new_order(address, &info)).await;
                    }
                    report.orders.push(order);
                }
                Err(e) => {
                    warn!("⚠️ 表格中的订单无效: {}", e);
                    report
                        .notices
                        .push(format!("{}\nInvalid Order.\n", describe_raw(line)));
                    report.invalid += 1;
                }
            }
        }

        info!(
            "✓ 共 {} 个订单 (新增 {}, 无效 {})",
            report.orders.len(),
            report.added,
            report.invalid
        );
        report
    }

    async fn notify(&self, notification: Notification) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };
        match dispatcher.send(&notification).await {
            Ok(()) => {}
            Err(DispatchError::InvalidAddress { address }) => {
                debug!("不是有效邮箱，跳过通知: {}", address);
            }
            Err(e) => warn!("⚠️ 通知发送失败 ({}): {}", notification.to, e),
        }
    }
}

/// 无效行的可读描述，如 `VIN, 123, a@b.com`
fn describe_raw(line: &str) -> String {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let mut fields = compact.split(',');
    let kind = match fields.next().map(str::to_lowercase).as_deref() {
        Some("vin") => "VIN".to_string(),
        Some("num") => "Order Number & Dealer Code".to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    std::iter::once(kind)
        .chain(fields.map(str::to_string))
        .collect::<Vec<_>>()
        .join(", ")
}

fn last_field(line: &str) -> Option<String> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let mut fields = compact.split(',');
    fields.next();
    fields.last().map(str::to_lowercase).filter(|f| f.contains('@'))
}
