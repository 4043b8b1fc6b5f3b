use crate::error::{AppError, InputError};
use crate::models::order::OrderDescriptor;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// 读取订单列表文件，返回非空行
pub async fn load_order_lines(path: &Path) -> Result<Vec<String>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(AppError::from(InputError::ListNotFound {
            path: path.display().to_string(),
        })
        .into());
    }

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取订单列表: {}", path.display()))?;

    let lines: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();

    tracing::info!("从 {} 读取到 {} 行订单", path.display(), lines.len());
    Ok(lines)
}

/// 以规范格式重写订单列表文件（覆盖旧文件）
///
/// 先写临时文件再改名，中途崩溃不会留下半个列表
pub async fn write_order_file(path: &Path, orders: &[OrderDescriptor]) -> Result<()> {
    let mut content = String::new();
    for order in orders {
        content.push_str(&order.canonical());
        content.push('\n');
    }

    let tmp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("无法创建临时文件: {}", tmp_path.display()))?;
    file.write_all(content.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("无法写入订单列表: {}", path.display()))?;

    tracing::debug!("订单列表已更新: {} ({} 条)", path.display(), orders.len());
    Ok(())
}
