//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一轮检查的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量订单处理器
//! - 管理应用生命周期（初始化、运行、收尾）
//! - 登记订单（列表 + 表格新订单）
//! - 按提交顺序输出报告、移除已交付订单、追加运行记录
//!
//! ### `worker_pool` - 固定大小工作池
//! - 所有工作线程从同一队列领取任务，队列为空即退出
//! - 结果经通道交给唯一的汇总者，按下标落槽
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<OrderDescriptor>)
//!     ↓
//! worker_pool (并发调度，保序汇总)
//!     ↓
//! workflow::OrderFlow (处理单个订单)
//!     ↓
//! services (能力层：解析 / 窗贴 / 通知 / 登记)
//!     ↓
//! clients + infrastructure (镜像抓取、HTTP 传输、记录存储)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管一轮，worker_pool 管并发
//! 2. **资源隔离**：只有编排层创建传输和发送器
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和统计，不做状态判定

pub mod batch_processor;
pub mod worker_pool;

// 重新导出主要类型
pub use batch_processor::{App, RunMode, RunOptions, RunSummary};
pub use worker_pool::WorkerPool;
