//! 订单处理流程 - 流程层
//!
//! 核心职责：定义"一个订单"的完整检查流程
//!
//! 流程顺序：
//! 1. 镜像抓取 + 页面解析（结构缺失视为数据源降级，触发重试 / 切换镜像）
//! 2. 窗贴下载去重（可选）
//! 3. 状态转移引擎判定 → 发送通知 → 写回记录
//! 4. 渲染报告

use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clients::{Attempt, Fetched, MirrorFetcher};
use crate::error::{AppResult, DispatchError};
use crate::infrastructure::RecordStore;
use crate::models::{OrderSnapshot, PollOutcome, SubjectKey};
use crate::services::{
    DocOutcome, DocumentService, NotificationDispatcher, ParseOutcome, SnapshotBuilder,
};
use crate::workflow::order_ctx::OrderCtx;
use crate::workflow::report::{self, Report};
use crate::workflow::state_engine::Decision;

const SOURCE_DOWN: &str = "Source Down. Please try again later.";

/// 本轮通知的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// 没有变化，不欠通知
    NotOwed,
    Sent,
    /// 地址无效，标记保持不变
    InvalidAddress,
    /// 发送失败，下一轮重试
    Failed(String),
}

impl fmt::Display for NotifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyOutcome::NotOwed => write!(f, "No Change"),
            NotifyOutcome::Sent => write!(f, "Sent"),
            NotifyOutcome::InvalidAddress => write!(f, "Invalid Email Address"),
            NotifyOutcome::Failed(reason) => write!(f, "Failed ({}), will retry next run", reason),
        }
    }
}

/// 订单处理流程
///
/// - 编排完整的单订单检查流程
/// - 决定何时重试、何时终止、何时写回记录
/// - 所有错误都收敛在本订单内，只以报告的形式交给协调器
pub struct OrderFlow {
    fetcher: MirrorFetcher,
    parser: Arc<dyn SnapshotBuilder>,
    store: Arc<dyn RecordStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    documents: Option<DocumentService>,
    vehicle_summary: bool,
}

impl OrderFlow {
    pub fn new(
        fetcher: MirrorFetcher,
        parser: Arc<dyn SnapshotBuilder>,
        store: Arc<dyn RecordStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            fetcher,
            parser,
            store,
            dispatcher,
            documents: None,
            vehicle_summary: false,
        }
    }

    /// 启用窗贴下载
    pub fn with_documents(mut self, documents: DocumentService) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn with_vehicle_summary(mut self, enabled: bool) -> Self {
        self.vehicle_summary = enabled;
        self
    }

    pub async fn run(&self, ctx: &OrderCtx) -> PollOutcome {
        let descriptor = &ctx.descriptor;
        info!("{} 🔍 开始查询", ctx);

        let fetched = self
            .fetcher
            .fetch_with(&descriptor.query(), |body| {
                match self.parser.parse(&String::from_utf8_lossy(&body)) {
                    ParseOutcome::Snapshot(snapshot) => Attempt::Accept(Ok(snapshot)),
                    ParseOutcome::NotFound(message) => Attempt::Accept(Err(message)),
                    ParseOutcome::SourceDown => Attempt::Retry("页面结构缺失".to_string()),
                }
            })
            .await;

        let (snapshot, mirror) = match fetched {
            Ok(Fetched {
                value: Ok(snapshot),
                mirror,
                ..
            }) => (snapshot, mirror),
            Ok(Fetched {
                value: Err(message),
                ..
            }) => {
                warn!("{} ⚠️ 上游表示订单不存在: {}", ctx, message);
                return PollOutcome::unavailable(report::failure(descriptor, &message));
            }
            Err(e) => {
                error!("{} ❌ {}", ctx, e);
                return PollOutcome::source_down(report::failure(descriptor, SOURCE_DOWN));
            }
        };

        info!(
            "{} ✓ 当前状态: {}, EDD: {}",
            ctx,
            snapshot.state,
            if snapshot.edd.is_empty() { "N/A" } else { snapshot.edd.as_str() }
        );

        let key = SubjectKey::for_descriptor(descriptor);
        let document = self.check_document(ctx, &key, &snapshot.vin).await;

        // 没有邮箱的订单只查询，不跟踪
        let notification = match descriptor.email.as_deref() {
            Some(email) => match self.track(ctx, &key, email, &snapshot).await {
                Ok(outcome) => Some(outcome.to_string()),
                Err(e) => {
                    error!("{} ❌ 记录读写失败: {}", ctx, e);
                    return PollOutcome::source_down(report::failure(
                        descriptor,
                        &format!("Record Store Error: {}", e),
                    ));
                }
            },
            None => None,
        };

        let text = Report {
            snapshot: &snapshot,
            mirror: &mirror,
            document,
            notification,
            vehicle_summary: self.vehicle_summary,
        }
        .render();

        PollOutcome::success(text, snapshot.state.is_terminal())
    }

    async fn check_document(
        &self,
        ctx: &OrderCtx,
        key: &SubjectKey,
        vin: &str,
    ) -> Option<DocOutcome> {
        let documents = self.documents.as_ref()?;
        match documents.fetch_document(key, vin).await {
            Ok(outcome) => {
                debug!("{} 窗贴: {}", ctx, outcome);
                Some(outcome)
            }
            Err(e) => {
                warn!("{} ⚠️ 窗贴处理失败: {}", ctx, e);
                Some(if documents.exists_locally(key) {
                    DocOutcome::FoundBefore
                } else {
                    DocOutcome::NotFoundRemote
                })
            }
        }
    }

    /// 读记录 → 判定 → 发送 → 写回
    ///
    /// 记录在判定之后无条件写回，即使不欠通知
    async fn track(
        &self,
        ctx: &OrderCtx,
        key: &SubjectKey,
        email: &str,
        snapshot: &OrderSnapshot,
    ) -> AppResult<NotifyOutcome> {
        let persisted = self.store.load(key).await?;
        let available = self
            .documents
            .as_ref()
            .is_some_and(|documents| documents.exists_locally(key));

        let mut decision = Decision::evaluate(snapshot, persisted.as_ref(), available);
        debug!("{} 判定结果: {:?}", ctx, decision);

        let outcome = if decision.notify {
            let attachment = self.load_attachment(ctx, key, &mut decision).await;
            let notification = decision.notification(email, snapshot, attachment);
            match self.dispatcher.send(&notification).await {
                Ok(()) => NotifyOutcome::Sent,
                Err(DispatchError::InvalidAddress { address }) => {
                    warn!("{} ⚠️ 邮箱地址无效: {}", ctx, address);
                    NotifyOutcome::InvalidAddress
                }
                Err(e) => {
                    warn!("{} ⚠️ 通知发送失败，下一轮重试: {}", ctx, e);
                    NotifyOutcome::Failed(e.to_string())
                }
            }
        } else {
            NotifyOutcome::NotOwed
        };

        let record = decision.merge(
            snapshot,
            persisted.as_ref(),
            outcome == NotifyOutcome::Sent,
            Utc::now(),
        );
        self.store.save(key, &record).await?;
        Ok(outcome)
    }

    /// 读取需要随信发送的窗贴；读不到就不附带，也不标记为已送达
    async fn load_attachment(
        &self,
        ctx: &OrderCtx,
        key: &SubjectKey,
        decision: &mut Decision,
    ) -> Option<Vec<u8>> {
        decision.document_due?;
        let documents = self.documents.as_ref()?;
        match tokio::fs::read(documents.path_for(key)).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("{} ⚠️ 读取窗贴失败，本次不附带: {}", ctx, e);
                decision.document_due = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::RetryPolicy;
    use crate::infrastructure::http_transport::testing::ScriptedTransport;
    use crate::infrastructure::FileRecordStore;
    use crate::models::{LifecycleState, OrderDescriptor, OutcomeClass, PersistedRecord};
    use crate::services::document_service::fixtures::sticker_pdf;
    use crate::services::notifier::testing::RecordingDispatcher;
    use crate::services::snapshot_parser::fixtures::order_page;
    use crate::services::RegexSnapshotParser;
    use std::path::Path;
    use std::time::Duration;

    const MIRROR_A: &str = "http://mirror-a";
    const MIRROR_B: &str = "http://mirror-b";
    const STICKER: &str = "http://sticker";
    const VIN: &str = "1FTEW1EG0HFA12345";

    struct Harness {
        flow: OrderFlow,
        transport: Arc<ScriptedTransport>,
        dispatcher: Arc<RecordingDispatcher>,
        store: Arc<FileRecordStore>,
    }

    fn harness(transport: ScriptedTransport, dir: &Path, documents: bool) -> Harness {
        let transport = Arc::new(transport);
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let store = Arc::new(FileRecordStore::new(dir));
        let policy = RetryPolicy {
            mirrors: vec![MIRROR_A.to_string(), MIRROR_B.to_string()],
            attempts_per_mirror: 2,
            attempt_timeout: Duration::from_secs(1),
            backoff: Duration::ZERO,
        };
        let mut flow = OrderFlow::new(
            MirrorFetcher::new(transport.clone(), policy),
            Arc::new(RegexSnapshotParser::new().unwrap()),
            store.clone(),
            dispatcher.clone(),
        );
        if documents {
            let service =
                DocumentService::new(transport.clone(), STICKER, 1, Duration::from_secs(1), dir)
                    .unwrap();
            flow = flow.with_documents(service);
        }
        Harness {
            flow,
            transport,
            dispatcher,
            store,
        }
    }

    fn page(edd: &str, state: &str) -> Result<Vec<u8>, u16> {
        Ok(order_page(VIN, edd, state, &[]).into_bytes())
    }

    fn ctx(line: &str) -> OrderCtx {
        OrderCtx::new(0, OrderDescriptor::parse_line(line).unwrap())
    }

    fn key() -> SubjectKey {
        SubjectKey::new(VIN, Some("a@b.com"))
    }

    #[tokio::test]
    async fn test_first_check_notifies_then_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            ScriptedTransport::default().on(
                MIRROR_A,
                vec![page("2018/05/01", "In Production"), page("2018/05/01", "In Production")],
            ),
            dir.path(),
            false,
        );
        let ctx = ctx(&format!("vin,{},a@b.com", VIN));

        let first = h.flow.run(&ctx).await;
        assert!(first.is_success());
        assert!(first.report.contains("\tEmail: Sent\n"));
        let sent = h.dispatcher.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.ends_with("(Initial Check)"));
        assert_eq!(sent[0].body, "EDD: 2018/05/01\nStatus: In Production\n");

        let record = h.store.load(&key()).await.unwrap().unwrap();
        assert!(record.notification_sent);
        assert!(record.initial_notification_sent);

        let second = h.flow.run(&ctx).await;
        assert!(second.report.contains("\tEmail: No Change\n"));
        assert_eq!(h.dispatcher.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_dispatch_retried_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            ScriptedTransport::default().on(
                MIRROR_A,
                vec![page("2018/05/01", "In Transit"), page("2018/05/01", "In Transit")],
            ),
            dir.path(),
            false,
        );
        let ctx = ctx(&format!("vin,{},a@b.com", VIN));

        h.dispatcher.set_failing(true);
        let first = h.flow.run(&ctx).await;
        assert!(first.is_success());
        let record = h.store.load(&key()).await.unwrap().unwrap();
        assert!(!record.notification_sent);
        assert!(record.state_changed_pending);

        h.dispatcher.set_failing(false);
        h.flow.run(&ctx).await;
        let sent = h.dispatcher.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].body.contains("Status: In Transit"));
        assert!(sent[1].subject.ends_with("(Initial Check)"));
        assert!(h.store.load(&key()).await.unwrap().unwrap().notification_sent);
    }

    #[tokio::test]
    async fn test_not_found_is_terminal_and_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let not_found = r#"<p class="top-level-error enabled">Order not found</p>"#;
        let h = harness(
            ScriptedTransport::default().on(MIRROR_A, vec![Ok(not_found.as_bytes().to_vec())]),
            dir.path(),
            false,
        );

        let outcome = h.flow.run(&ctx(&format!("vin,{},a@b.com", VIN))).await;

        assert_eq!(outcome.class, OutcomeClass::Unavailable);
        assert_eq!(
            outcome.report,
            format!("VIN: {}, Email: a@b.com\nOrder not found\n", VIN)
        );
        assert_eq!(h.transport.calls().len(), 1);
        assert!(h.store.load(&key()).await.unwrap().is_none());
        assert!(h.dispatcher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_source_down_leaves_record_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let broken = Ok(b"<html>maintenance</html>".to_vec());
        let h = harness(
            ScriptedTransport::default()
                .on(MIRROR_A, vec![broken.clone(), broken.clone()])
                .on(MIRROR_B, vec![broken.clone(), broken]),
            dir.path(),
            false,
        );
        let before = PersistedRecord {
            edd: "2018/05/01".to_string(),
            state: LifecycleState::InProduction,
            notification_sent: false,
            initial_notification_sent: false,
            document_delivered: false,
            edd_changed_pending: true,
            state_changed_pending: true,
            vehicle_name: String::new(),
            checked_at: Utc::now(),
        };
        h.store.save(&key(), &before).await.unwrap();

        let outcome = h.flow.run(&ctx(&format!("vin,{},a@b.com", VIN))).await;

        assert_eq!(outcome.class, OutcomeClass::SourceDown);
        assert!(outcome.report.ends_with("Source Down. Please try again later.\n"));
        assert_eq!(
            h.transport.calls(),
            vec![MIRROR_A, MIRROR_A, MIRROR_B, MIRROR_B]
        );
        assert_eq!(h.store.load(&key()).await.unwrap(), Some(before));
        assert!(h.dispatcher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_structure_missing_fails_over_to_next_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            ScriptedTransport::default()
                .on(MIRROR_A, vec![Ok(Vec::new()), Err(503)])
                .on(MIRROR_B, vec![page("", "Delivered")]),
            dir.path(),
            false,
        );

        let outcome = h.flow.run(&ctx(&format!("vin,{}", VIN))).await;

        assert!(outcome.is_success());
        assert!(outcome.delivered);
        assert!(outcome.report.contains("\tSource: http://mirror-b\n"));
    }

    #[tokio::test]
    async fn test_order_without_email_is_not_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            ScriptedTransport::default().on(MIRROR_A, vec![page("2018/05/01", "In Production")]),
            dir.path(),
            false,
        );

        let ctx = ctx("num,AB12,F12345");
        let outcome = h.flow.run(&ctx).await;

        assert!(outcome.is_success());
        assert!(!outcome.report.contains("Email:"));
        assert!(h.dispatcher.sent().is_empty());
        assert!(h
            .store
            .load(&SubjectKey::for_descriptor(&ctx.descriptor))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_released_document_is_attached_once() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            ScriptedTransport::default()
                .on(
                    MIRROR_A,
                    vec![page("2018/05/01", "In Transit"), page("2018/05/01", "In Transit")],
                )
                .on(STICKER, vec![Ok(sticker_pdf("v1")), Ok(sticker_pdf("v1"))]),
            dir.path(),
            true,
        );
        let ctx = ctx(&format!("vin,{},a@b.com", VIN));

        let first = h.flow.run(&ctx).await;
        assert!(first.report.contains("\tWindow Sticker: RELEASED\n"));
        let sent = h.dispatcher.sent();
        assert_eq!(sent[0].attachments.len(), 1);
        assert_eq!(sent[0].attachments[0].filename, format!("{}.pdf", VIN));
        assert!(sent[0].body.ends_with("Window Sticker Released!\n"));

        let second = h.flow.run(&ctx).await;
        assert!(second.report.contains("\tWindow Sticker: FOUND BEFORE\n"));
        assert_eq!(h.dispatcher.sent().len(), 1);
        assert!(h.store.load(&key()).await.unwrap().unwrap().document_delivered);
    }
}
