use anyhow::{Context, Result};
/// 日志工具模块
///
/// 提供日志初始化、运行记录和统计输出的辅助函数
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 输出
///
/// 日志写到 stderr，stdout 只留给订单报告；`RUST_LOG` 优先于 `verbose`
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// 追加一行运行记录
///
/// # 参数
/// - `path`: 运行记录文件
/// - `total`: 本轮订单数
/// - `success`: 查询成功数
pub fn append_run_log(path: &Path, total: usize, success: usize) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("无法打开运行记录: {}", path.display()))?;
    writeln!(
        file,
        "{}\tTotal Orders: {}, Query Success: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        total,
        success
    )
    .with_context(|| format!("无法写入运行记录: {}", path.display()))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(max_workers: usize, mirrors: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 订单状态检查");
    info!("📊 工作线程数: {}", max_workers);
    info!("🌐 镜像数: {}", mirrors);
    info!("{}", "=".repeat(60));
}

/// 记录订单加载信息
pub fn log_orders_loaded(total: usize, max_workers: usize) {
    info!("✓ 本轮共 {} 个订单", total);
    info!("📋 由 {} 个工作线程从同一队列领取", max_workers.min(total.max(1)));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `run_log`: 运行记录文件
pub fn print_final_stats(success: usize, failed: usize, total: usize, run_log: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部检查完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n运行记录已追加至: {}", run_log.display());
}
