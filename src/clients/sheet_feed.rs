/// 表格订单源客户端
///
/// 从表格的 CSV 导出地址拉取新登记的订单，用游标文件记住读到了第几行
use crate::error::AppError;
use crate::infrastructure::HttpTransport;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

/// 表头占第 1 行，数据从第 2 行开始
const FIRST_DATA_ROW: usize = 2;

/// 新订单来源
#[async_trait]
pub trait OrderFeed: Send + Sync {
    /// 返回自上次调用以来新增的订单行（与订单列表同格式，尚未校验）
    async fn fetch_new_orders(&self) -> Result<Vec<String>>;
}

/// CSV 导出格式的表格订单源
///
/// 列顺序：邮箱, 类型(VIN / 其他), 订单号, 经销商代码, VIN
pub struct CsvSheetFeed {
    transport: Arc<dyn HttpTransport>,
    url: String,
    cursor_file: PathBuf,
}

impl CsvSheetFeed {
    pub fn new(transport: Arc<dyn HttpTransport>, url: impl Into<String>, cursor_file: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            url: url.into(),
            cursor_file: cursor_file.into(),
        }
    }

    async fn read_cursor(&self) -> usize {
        match fs::read_to_string(&self.cursor_file).await {
            Ok(content) => content.trim().parse().unwrap_or(FIRST_DATA_ROW),
            Err(_) => FIRST_DATA_ROW,
        }
    }

    async fn write_cursor(&self, row: usize) -> Result<()> {
        fs::write(&self.cursor_file, row.to_string())
            .await
            .with_context(|| format!("无法写入表格游标: {}", self.cursor_file.display()))
    }
}

#[async_trait]
impl OrderFeed for CsvSheetFeed {
    async fn fetch_new_orders(&self) -> Result<Vec<String>> {
        let cursor = self.read_cursor().await;
        debug!("从表格第 {} 行开始读取", cursor);

        let body = self
            .transport
            .get(&self.url, &[])
            .await
            .map_err(AppError::from)
            .context("拉取表格失败")?;
        let text = String::from_utf8_lossy(&body);

        let rows: Vec<&str> = text.lines().skip(cursor.saturating_sub(1)).collect();
        let orders: Vec<String> = rows
            .iter()
            .filter(|row| !row.trim().is_empty())
            .map(|row| row_to_order_line(&split_csv_line(row)))
            .collect();

        if !rows.is_empty() {
            self.write_cursor(cursor + rows.len()).await?;
        }

        info!("📋 表格中有 {} 条新订单", orders.len());
        Ok(orders)
    }
}

/// 把一行表格转换为订单列表格式
fn row_to_order_line(cells: &[String]) -> String {
    let cell = |i: usize| cells.get(i).map(|s| s.trim()).unwrap_or("");
    let email = cell(0);
    if cell(1).eq_ignore_ascii_case("vin") {
        format!("vin,{},{}", cell(4), email)
    } else {
        format!("num,{},{},{}", cell(2), cell(3), email)
    }
}

/// 按逗号切分一行 CSV，支持双引号包裹和 `""` 转义
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}
