//! 订单页面解析服务 - 业务能力层
//!
//! 只负责把上游页面变成 `OrderSnapshot`，区分三种结果：快照 / 订单不存在 / 数据源降级

use crate::error::{AppError, AppResult};
use crate::models::{LifecycleState, OrderSnapshot};
use regex::Regex;

/// 页面解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// 成功解析出快照
    Snapshot(OrderSnapshot),
    /// 页面中有明确的错误提示（订单不存在 / 输入无效）
    NotFound(String),
    /// 没有错误提示但结构完全缺失，视为数据源降级，可重试
    SourceDown,
}

/// 快照构建能力
pub trait SnapshotBuilder: Send + Sync {
    fn parse(&self, raw: &str) -> ParseOutcome;
}

/// 基于正则的页面解析器
pub struct RegexSnapshotParser {
    top_level_error: Regex,
    vehicle_name: Regex,
    order_date: Regex,
    order_number: Regex,
    dealer_code: Regex,
    vin: Regex,
    edd: Regex,
    current_state: Regex,
    dealer_name: Regex,
    completed_on: Regex,
    summary_item: Regex,
}

impl RegexSnapshotParser {
    pub fn new() -> AppResult<Self> {
        let re = |pattern: &str| {
            Regex::new(pattern).map_err(|e| AppError::Other(format!("正则编译失败: {}", e)))
        };
        Ok(Self {
            top_level_error: re(r#"class="top-level-error enabled">(.*?)</p>"#)?,
            vehicle_name: re(r#"class="vehicleName">(.*?)</span>"#)?,
            order_date: re(r#"class="orderDate">(.*?)</span>"#)?,
            order_number: re(r#"class="orderNumber">(.*?)</span>"#)?,
            dealer_code: re(r#""dealerInfo": \{ "dealerCode":(.*?)\}"#)?,
            vin: re(r#"class="vin">(.*?)</span>"#)?,
            edd: re(r#"id="hidden-estimated-delivery-date" data-part="(.*?)""#)?,
            current_state: re(r#""selectedStepName":(.*?)"surveyOn""#)?,
            dealer_name: re(r#"class="dealerName">(.*?)</span>"#)?,
            completed_on: re(r#"Completed On : </span>(.*?)</span>"#)?,
            summary_item: re(r#"class="part-detail-description.*?>(.*?)</div>"#)?,
        })
    }

    fn capture(re: &Regex, text: &str) -> Option<String> {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    }

    fn build(&self, page: &str) -> Option<OrderSnapshot> {
        let vehicle_name = Self::capture(&self.vehicle_name, page)?;
        let order_date = Self::capture(&self.order_date, page)?;
        let order_number = Self::capture(&self.order_number, page)?;
        let dealer_code = Self::capture(&self.dealer_code, page)?
            .replace('"', "")
            .trim()
            .to_string();
        let vin = Self::capture(&self.vin, page)?;
        let edd = Self::capture(&self.edd, page)?;
        let state_text = Self::capture(&self.current_state, page)?
            .replace([',', '"'], "");
        let state = LifecycleState::from_upstream(&state_text)?;

        let dealer_name = Self::capture(&self.dealer_name, page)
            .map(|name| name.replace([',', '"'], "").trim().to_string())
            .filter(|name| !name.is_empty());

        let state_dates = self
            .completed_on
            .captures_iter(page)
            .filter_map(|c| c.get(1))
            .map(|m| expand_year(&m.as_str().replace('.', "/")))
            .collect();

        let mut vehicle_summary: Vec<String> = Vec::new();
        for item in self
            .summary_item
            .captures_iter(page)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
        {
            if !vehicle_summary.contains(&item) {
                vehicle_summary.push(item);
            }
        }

        Some(OrderSnapshot {
            vehicle_name,
            order_date,
            order_number,
            dealer_code,
            vin,
            dealer_name,
            edd,
            state,
            state_dates,
            vehicle_summary,
        })
    }
}

impl SnapshotBuilder for RegexSnapshotParser {
    fn parse(&self, raw: &str) -> ParseOutcome {
        let page = raw.replace(['\n', '\r'], "");

        if let Some(message) = Self::capture(&self.top_level_error, &page) {
            return ParseOutcome::NotFound(message);
        }

        match self.build(&page) {
            Some(snapshot) => ParseOutcome::Snapshot(snapshot),
            None => ParseOutcome::SourceDown,
        }
    }
}

/// `05/01/18` → `05/01/2018`
fn expand_year(date: &str) -> String {
    let date = date.trim();
    match (date.get(..6), date.get(6..)) {
        (Some(head), Some(tail)) if tail.len() == 2 => {
            format!("{}20{}", head, tail)
        }
        _ => date.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// 构造一个上游订单页面
    pub(crate) fn order_page(vin: &str, edd: &str, state: &str, dates: &[&str]) -> String {
        let mut page = String::new();
        page.push_str(r#"<span class="vehicleName">2018 F-150</span>"#);
        page.push_str(r#"<span class="orderDate">01/02/2018</span>"#);
        page.push_str(r#"<span class="orderNumber">AB12</span>"#);
        page.push_str(r#""dealerInfo": { "dealerCode":"F12345"}"#);
        page.push_str(&format!(r#"<span class="vin">{}</span>"#, vin));
        page.push_str(r#"<span class="dealerName">Some Ford, "Inc"</span>"#);
        page.push_str(&format!(
            r#"<input id="hidden-estimated-delivery-date" data-part="{}">"#,
            edd
        ));
        page.push_str(&format!(r#""selectedStepName":"{}","surveyOn""#, state));
        for date in dates {
            page.push_str(&format!(
                "<span>Completed On : </span>{}</span>\n",
                date
            ));
        }
        page.push_str(r#"<div class="part-detail-description x">5.0L V8</div>"#);
        page.push_str(r#"<div class="part-detail-description x">5.0L V8</div>"#);
        page.push_str(r#"<div class="part-detail-description y">Tow Package</div>"#);
        page
    }
}
