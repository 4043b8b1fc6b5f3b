//! 状态转移引擎 - 流程层
//!
//! 纯函数：给定新快照和上次持久化的记录，决定哪些事实变了、是否欠一封通知、
//! 窗贴是否需要随信发送，以及本轮结束时应写回的完整记录。
//!
//! 不做任何 I/O，发送和落盘由 `OrderFlow` 负责，方便对每条规则单独测试。

use crate::models::{OrderSnapshot, PersistedRecord};
use crate::services::notifier::{Attachment, Notification};
use chrono::{DateTime, Utc};

/// EDD 被上游清空时正文里使用的占位
const EDD_REMOVED: &str = "Removed";

/// 本轮需要随通知发送的窗贴
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentNotice {
    /// 本地已有且从未成功发送过
    Released,
    /// 订单已交付，再发一次最终版本
    ClosingCopy,
}

impl DocumentNotice {
    pub fn body_line(self) -> &'static str {
        match self {
            DocumentNotice::Released => "Window Sticker Released!",
            DocumentNotice::ClosingCopy => "Window Sticker Updated!",
        }
    }
}

/// 一轮检查的判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub edd_changed: bool,
    pub state_changed: bool,
    pub document_due: Option<DocumentNotice>,
    /// 是否欠一封通知
    pub notify: bool,
    /// 初始通知尚未成功送达，标题需要带 `(Initial Check)`
    pub initial: bool,
}

impl Decision {
    /// 对比快照与上次记录
    ///
    /// `document_available` 表示本地此刻是否有该对象的窗贴
    pub fn evaluate(
        snapshot: &OrderSnapshot,
        persisted: Option<&PersistedRecord>,
        document_available: bool,
    ) -> Self {
        let (mut edd_changed, mut state_changed) = match persisted {
            // 首次检查：状态一定算变化，EDD 非空才算
            None => (!snapshot.edd.is_empty(), true),
            Some(record) => (snapshot.edd != record.edd, snapshot.state != record.state),
        };

        // 上次检测到的变化没有送达，不能因为本轮没再变化就丢掉
        if let Some(record) = persisted.filter(|r| !r.notification_sent) {
            edd_changed |= record.edd_changed_pending;
            state_changed |= record.state_changed_pending;
        }

        let delivered_before = persisted.is_some_and(|r| r.document_delivered);
        let document_due = if !document_available {
            None
        } else if !delivered_before {
            Some(DocumentNotice::Released)
        } else if snapshot.state.is_terminal() {
            Some(DocumentNotice::ClosingCopy)
        } else {
            None
        };

        let previously_sent = persisted.is_some_and(|r| r.notification_sent);
        let notify = edd_changed || state_changed || document_due.is_some() || !previously_sent;

        Self {
            edd_changed,
            state_changed,
            document_due,
            notify,
            initial: !persisted.is_some_and(|r| r.initial_notification_sent),
        }
    }

    /// 通知正文：只包含本轮确实变化的事实
    pub fn body(&self, snapshot: &OrderSnapshot) -> String {
        let mut body = String::new();
        if self.edd_changed {
            let edd = if snapshot.edd.is_empty() {
                EDD_REMOVED
            } else {
                snapshot.edd.as_str()
            };
            body.push_str(&format!("EDD: {}\n", edd));
        }
        if self.state_changed {
            body.push_str(&format!("Status: {}\n", snapshot.state));
        }
        if let Some(notice) = self.document_due {
            body.push_str(notice.body_line());
            body.push('\n');
        }
        body
    }

    /// 组装通知；窗贴内容由调用方读出后传入
    pub fn notification(
        &self,
        to: &str,
        snapshot: &OrderSnapshot,
        document: Option<Vec<u8>>,
    ) -> Notification {
        let attachments = document
            .map(|content| Attachment {
                filename: format!("{}.pdf", snapshot.vin),
                content,
            })
            .into_iter()
            .collect();

        Notification {
            to: to.to_string(),
            subject: Notification::status_subject(&snapshot.vin, self.initial),
            body: self.body(snapshot),
            attachments,
        }
    }

    /// 本轮结束时写回的完整记录
    ///
    /// `sent` 只有在通知确实送达时才为 true；未送达时完成标记保持原值，
    /// 检测到的变化记为待发，下一轮继续重试
    pub fn merge(
        &self,
        snapshot: &OrderSnapshot,
        persisted: Option<&PersistedRecord>,
        sent: bool,
        checked_at: DateTime<Utc>,
    ) -> PersistedRecord {
        let (was_sent, was_initial, was_delivered) = persisted.map_or((false, false, false), |r| {
            (r.notification_sent, r.initial_notification_sent, r.document_delivered)
        });
        let delivered = sent && self.notify;

        PersistedRecord {
            edd: snapshot.edd.clone(),
            state: snapshot.state,
            notification_sent: if self.notify { delivered } else { was_sent },
            initial_notification_sent: delivered || was_initial,
            document_delivered: (delivered && self.document_due.is_some()) || was_delivered,
            edd_changed_pending: self.edd_changed && !delivered,
            state_changed_pending: self.state_changed && !delivered,
            vehicle_name: snapshot.vehicle_name.clone(),
            checked_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LifecycleState;

    fn snapshot(edd: &str, state: LifecycleState) -> OrderSnapshot {
        OrderSnapshot {
            vehicle_name: "2018 F-150".to_string(),
            order_date: "01/02/2018".to_string(),
            order_number: "AB12".to_string(),
            dealer_code: "F12345".to_string(),
            vin: "1FTEW1EG0HFA12345".to_string(),
            dealer_name: None,
            edd: edd.to_string(),
            state,
            state_dates: Vec::new(),
            vehicle_summary: Vec::new(),
        }
    }

    fn record(edd: &str, state: LifecycleState) -> PersistedRecord {
        PersistedRecord {
            edd: edd.to_string(),
            state,
            notification_sent: true,
            initial_notification_sent: true,
            document_delivered: false,
            edd_changed_pending: false,
            state_changed_pending: false,
            vehicle_name: "2018 F-150".to_string(),
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn test_first_check_always_notifies() {
        let snap = snapshot("", LifecycleState::OrderProcessing);
        let decision = Decision::evaluate(&snap, None, false);

        assert!(decision.state_changed);
        assert!(!decision.edd_changed);
        assert!(decision.notify);
        assert!(decision.initial);

        let with_edd = Decision::evaluate(&snapshot("2018/05/01", LifecycleState::InProduction), None, false);
        assert!(with_edd.edd_changed);
    }

    #[test]
    fn test_stable_snapshot_after_success_is_quiet() {
        let snap = snapshot("2018/05/01", LifecycleState::InProduction);
        let prev = record("2018/05/01", LifecycleState::InProduction);
        let decision = Decision::evaluate(&snap, Some(&prev), false);

        assert!(!decision.notify);
        assert!(!decision.initial);

        let next = decision.merge(&snap, Some(&prev), false, Utc::now());
        assert!(next.notification_sent);
        assert!(!next.edd_changed_pending);
    }

    #[test]
    fn test_failed_send_is_retried_until_success() {
        let snap = snapshot("2018/05/01", LifecycleState::InProduction);

        let first = Decision::evaluate(&snap, None, false);
        let after_failure = first.merge(&snap, None, false, Utc::now());
        assert!(!after_failure.notification_sent);
        assert!(!after_failure.initial_notification_sent);
        assert!(after_failure.state_changed_pending);

        let second = Decision::evaluate(&snap, Some(&after_failure), false);
        assert!(second.notify);
        assert!(second.initial);
        assert!(second.state_changed);

        let after_success = second.merge(&snap, Some(&after_failure), true, Utc::now());
        assert!(after_success.notification_sent);
        assert!(after_success.initial_notification_sent);
        assert!(!after_success.state_changed_pending);

        let third = Decision::evaluate(&snap, Some(&after_success), false);
        assert!(!third.notify);
    }

    #[test]
    fn test_new_change_with_failed_send_clears_sent_flag() {
        let prev = record("2018/05/01", LifecycleState::InProduction);
        let snap = snapshot("2018/05/01", LifecycleState::InTransit);

        let decision = Decision::evaluate(&snap, Some(&prev), false);
        let next = decision.merge(&snap, Some(&prev), false, Utc::now());

        assert!(prev.notification_sent);
        assert!(!next.notification_sent);
        assert!(next.state_changed_pending);
        assert!(next.initial_notification_sent);
    }

    #[test]
    fn test_pending_state_change_is_carried_forward() {
        let snap = snapshot("2018/05/01", LifecycleState::InTransit);
        let mut prev = record("2018/05/01", LifecycleState::InTransit);
        prev.notification_sent = false;
        prev.state_changed_pending = true;

        let decision = Decision::evaluate(&snap, Some(&prev), false);

        assert!(decision.notify);
        assert!(decision.state_changed);
        assert!(!decision.edd_changed);
        assert_eq!(decision.body(&snap), "Status: In Transit\n");
    }

    #[test]
    fn test_pending_ignored_once_notification_sent() {
        let snap = snapshot("2018/05/01", LifecycleState::InTransit);
        let mut prev = record("2018/05/01", LifecycleState::InTransit);
        prev.state_changed_pending = true;

        assert!(!Decision::evaluate(&snap, Some(&prev), false).notify);
    }

    #[test]
    fn test_removed_edd() {
        let snap = snapshot("", LifecycleState::InProduction);
        let prev = record("2018/05/01", LifecycleState::InProduction);
        let decision = Decision::evaluate(&snap, Some(&prev), false);

        assert!(decision.edd_changed);
        assert!(!decision.state_changed);
        assert!(decision.body(&snap).contains("EDD: Removed"));
    }

    #[test]
    fn test_backward_state_counts_as_change() {
        let snap = snapshot("2018/05/01", LifecycleState::InProduction);
        let prev = record("2018/05/01", LifecycleState::InTransit);
        assert!(Decision::evaluate(&snap, Some(&prev), false).state_changed);
    }

    #[test]
    fn test_document_released_once() {
        let snap = snapshot("2018/05/01", LifecycleState::InTransit);
        let prev = record("2018/05/01", LifecycleState::InTransit);

        let decision = Decision::evaluate(&snap, Some(&prev), true);
        assert_eq!(decision.document_due, Some(DocumentNotice::Released));
        assert!(decision.notify);

        let notification = decision.notification("a@b.com", &snap, Some(b"%PDF".to_vec()));
        assert_eq!(notification.body, "Window Sticker Released!\n");
        assert_eq!(notification.attachments[0].filename, "1FTEW1EG0HFA12345.pdf");
        assert!(!notification.subject.contains("Initial Check"));

        let next = decision.merge(&snap, Some(&prev), true, Utc::now());
        assert!(next.document_delivered);
        assert_eq!(Decision::evaluate(&snap, Some(&next), true).document_due, None);
    }

    #[test]
    fn test_document_not_marked_delivered_on_failure() {
        let snap = snapshot("2018/05/01", LifecycleState::InTransit);
        let prev = record("2018/05/01", LifecycleState::InTransit);
        let decision = Decision::evaluate(&snap, Some(&prev), true);

        let next = decision.merge(&snap, Some(&prev), false, Utc::now());
        assert!(!next.document_delivered);
        assert!(!next.notification_sent);
    }

    #[test]
    fn test_closing_copy_on_delivered() {
        let snap = snapshot("2018/05/01", LifecycleState::Delivered);
        let mut prev = record("2018/05/01", LifecycleState::Delivered);
        prev.document_delivered = true;

        let decision = Decision::evaluate(&snap, Some(&prev), true);
        assert_eq!(decision.document_due, Some(DocumentNotice::ClosingCopy));
        assert!(decision.notify);
        assert_eq!(decision.body(&snap), "Window Sticker Updated!\n");
    }

    #[test]
    fn test_initial_subject_until_first_success() {
        let snap = snapshot("", LifecycleState::OrderProcessing);
        let decision = Decision::evaluate(&snap, None, false);
        let notification = decision.notification("a@b.com", &snap, None);
        assert!(notification.subject.ends_with("(Initial Check)"));
        assert!(notification.attachments.is_empty());
    }
}
