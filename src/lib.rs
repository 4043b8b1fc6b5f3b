//! # Order Watch
//!
//! 一个用于跟踪车辆订单状态并在变化时发送通知的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `HttpExecutor` - HTTP 传输（`HttpTransport`）
//! - `FileRecordStore` - 每个跟踪对象一条记录（`RecordStore`）
//!
//! ### ② 客户端层（Clients）
//! - `MirrorFetcher` - 多镜像重试与切换
//! - `CsvSheetFeed` - 表格新订单来源
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个订单
//! - `RegexSnapshotParser` - 页面 → 快照 / 不存在 / 数据源降级
//! - `DocumentService` - 窗贴下载与内容去重
//! - `OutboxDispatcher` - 通知发送
//! - `OrderIntake` - 订单校验、去重、合并
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一个订单"的完整检查流程
//! - `Decision` - 状态转移引擎（纯函数）
//! - `OrderFlow` - 流程编排（抓取 → 解析 → 判定 → 通知 → 写回）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 一轮检查的生命周期
//! - `orchestrator/worker_pool` - 固定大小工作池，按提交顺序汇总
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{OrderDescriptor, OrderSnapshot, PersistedRecord, SubjectKey};
pub use orchestrator::{App, RunMode, RunOptions, RunSummary, WorkerPool};
pub use workflow::{Decision, OrderFlow};
