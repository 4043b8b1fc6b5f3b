//! 批量订单处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一轮检查的生命周期和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、创建 HTTP 传输、记录存储、通知发送器
//! 2. **订单登记**：读取订单列表、合并表格新订单、去重后以规范格式写回
//! 3. **并发检查**：交给 `WorkerPool`，每个订单走一遍 `OrderFlow`
//! 4. **按序输出**：报告按提交顺序打印，与完成顺序无关
//! 5. **收尾**：移除已交付订单、追加运行记录、输出统计
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个订单的细节
//! - **资源所有者**：唯一持有传输和发送器的模块
//! - **错误收敛**：单个订单的失败只体现在它自己的报告里

use crate::clients::{CsvSheetFeed, MirrorFetcher, OrderFeed, RetryPolicy};
use crate::config::Config;
use crate::infrastructure::{FileRecordStore, HttpExecutor, HttpTransport};
use crate::models::{load_order_lines, write_order_file, OrderDescriptor, PollOutcome};
use crate::orchestrator::worker_pool::WorkerPool;
use crate::services::{
    DocumentService, NotificationDispatcher, OrderIntake, OutboxDispatcher, RegexSnapshotParser,
};
use crate::utils::logging;
use crate::workflow::{report, OrderCtx, OrderFlow};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// 本轮检查的订单来源
#[derive(Debug, Clone)]
pub enum RunMode {
    /// 订单列表文件（可合并表格新订单）
    List(PathBuf),
    /// 命令行临时查询单个订单，不读写列表
    Single(OrderDescriptor),
}

/// 运行选项
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    /// 下载窗贴
    pub window_sticker: bool,
    /// 从列表中移除已交付订单
    pub remove_delivered: bool,
    /// 报告中附带车辆配置
    pub vehicle_summary: bool,
    /// 是否把报告打印到 stdout
    pub print: bool,
}

/// 一轮检查的汇总
#[derive(Debug, Default)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    /// 按提交顺序排列的报告
    pub reports: Vec<String>,
    /// 本轮处于 Delivered 的订单
    pub delivered: Vec<OrderDescriptor>,
}

/// 应用主结构
pub struct App {
    config: Config,
    options: RunOptions,
    flow: Arc<OrderFlow>,
    intake: OrderIntake,
    feed: Option<Box<dyn OrderFeed>>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config, options: RunOptions) -> Result<Self> {
        config.validate()?;
        let transport: Arc<dyn HttpTransport> = Arc::new(HttpExecutor::new(config.request_timeout())?);
        let dispatcher: Arc<dyn NotificationDispatcher> = Arc::new(OutboxDispatcher::new(
            config.mail_from.clone(),
            &config.outbox_dir,
        )?);
        if config.mail_from.is_none() {
            warn!("⚠️ 未配置发件人地址，通知将发送失败并在下一轮重试");
        }
        Self::with_parts(config, options, transport, dispatcher).await
    }

    /// 用给定的传输和发送器组装应用
    pub async fn with_parts(
        config: Config,
        options: RunOptions,
        transport: Arc<dyn HttpTransport>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Result<Self> {
        config.validate()?;
        logging::log_startup(config.max_workers, config.mirrors.len());

        let store = FileRecordStore::new(&config.info_dir);
        store.ensure_dir().await?;

        let mut flow = OrderFlow::new(
            MirrorFetcher::new(transport.clone(), RetryPolicy::from_config(&config)),
            Arc::new(RegexSnapshotParser::new()?),
            Arc::new(store),
            dispatcher.clone(),
        )
        .with_vehicle_summary(options.vehicle_summary);

        if options.window_sticker {
            flow = flow.with_documents(DocumentService::new(
                transport.clone(),
                config.document_url.clone(),
                config.attempts_per_mirror,
                config.request_timeout(),
                &config.document_dir,
            )?);
        }

        let feed: Option<Box<dyn OrderFeed>> = match (&options.mode, &config.sheet_feed_url) {
            (RunMode::List(_), Some(url)) => Some(Box::new(CsvSheetFeed::new(
                transport.clone(),
                url.clone(),
                &config.sheet_cursor_file,
            ))),
            _ => None,
        };

        Ok(Self {
            intake: OrderIntake::new(Some(dispatcher)),
            flow: Arc::new(flow),
            feed,
            config,
            options,
        })
    }

    /// 运行一轮检查
    pub async fn run(&self) -> Result<RunSummary> {
        let orders = self.load_orders().await?;

        if orders.is_empty() {
            warn!("⚠️ 没有需要检查的订单，程序结束");
            self.append_run_log(0, 0);
            return Ok(RunSummary::default());
        }

        let pool = WorkerPool::new(self.config.max_workers);
        logging::log_orders_loaded(orders.len(), pool.workers());

        let flow = self.flow.clone();
        let results = pool
            .run(orders.clone(), move |index, descriptor| {
                let flow = flow.clone();
                async move { flow.run(&OrderCtx::new(index, descriptor)).await }
            })
            .await;

        let summary = self.collect(&orders, results);

        if self.options.print {
            for text in &summary.reports {
                println!("{}", text);
            }
            println!(
                "Total Orders: {}, Query Success: {}",
                summary.total, summary.success
            );
        }

        if self.options.remove_delivered {
            self.remove_delivered(&orders, &summary.delivered).await?;
        }

        self.append_run_log(summary.total, summary.success);
        logging::print_final_stats(
            summary.success,
            summary.total - summary.success,
            summary.total,
            &self.config.run_log_file,
        );

        Ok(summary)
    }

    /// 读取并登记本轮订单
    async fn load_orders(&self) -> Result<Vec<OrderDescriptor>> {
        let path = match &self.options.mode {
            RunMode::Single(descriptor) => return Ok(vec![descriptor.clone()]),
            RunMode::List(path) => path,
        };

        info!("\n📁 正在读取订单列表...");
        let lines = load_order_lines(path).await?;

        let feed_lines = match &self.feed {
            Some(feed) => feed.fetch_new_orders().await.unwrap_or_else(|e| {
                warn!("⚠️ 表格新订单拉取失败，本轮跳过: {:#}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        let report = self.intake.intake(&lines, &feed_lines).await;
        if self.options.print {
            for notice in &report.notices {
                println!("{}", notice);
            }
        }

        write_order_file(path, &report.orders)
            .await
            .context("写回订单列表失败")?;
        Ok(report.orders)
    }

    /// 按提交顺序汇总结果
    fn collect(&self, orders: &[OrderDescriptor], results: Vec<Option<PollOutcome>>) -> RunSummary {
        let mut summary = RunSummary {
            total: orders.len(),
            ..Default::default()
        };

        for (descriptor, result) in orders.iter().zip(results) {
            let outcome = result.unwrap_or_else(|| {
                PollOutcome::source_down(report::failure(descriptor, "Internal Error."))
            });
            if outcome.is_success() {
                summary.success += 1;
            }
            if outcome.delivered {
                summary.delivered.push(descriptor.clone());
            }
            summary.reports.push(outcome.report);
        }
        summary
    }

    async fn remove_delivered(
        &self,
        orders: &[OrderDescriptor],
        delivered: &[OrderDescriptor],
    ) -> Result<()> {
        let RunMode::List(path) = &self.options.mode else {
            return Ok(());
        };
        if delivered.is_empty() {
            return Ok(());
        }

        let remaining: Vec<OrderDescriptor> = orders
            .iter()
            .filter(|order| !delivered.contains(order))
            .cloned()
            .collect();
        write_order_file(path, &remaining)
            .await
            .context("移除已交付订单失败")?;
        info!("🗑️ 已从列表中移除 {} 个已交付订单", delivered.len());
        Ok(())
    }

    /// 只有列表模式才记录，单个临时查询不记
    fn append_run_log(&self, total: usize, success: usize) {
        if !matches!(self.options.mode, RunMode::List(_)) {
            return;
        }
        if let Err(e) = logging::append_run_log(&self.config.run_log_file, total, success) {
            warn!("⚠️ {:#}", e);
        }
    }
}
