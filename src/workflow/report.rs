//! 报告渲染
//!
//! 每个跟踪对象输出一个报告块，批量输出时按提交顺序拼接

use crate::models::{LifecycleState, OrderDescriptor, OrderSnapshot};
use crate::services::DocOutcome;

const NA: &str = "N/A";

/// 成功检查的报告块
#[derive(Debug, Clone)]
pub struct Report<'a> {
    pub snapshot: &'a OrderSnapshot,
    pub mirror: &'a str,
    pub document: Option<DocOutcome>,
    pub notification: Option<String>,
    pub vehicle_summary: bool,
}

impl Report<'_> {
    pub fn render(&self) -> String {
        let s = self.snapshot;
        let mut lines = vec![
            "Order Information:".to_string(),
            format!("\tVehicle Name: {}", s.vehicle_name),
            format!("\tOrder Date: {}", s.order_date),
            format!("\tOrder Number: {}", s.order_number),
            format!("\tDealer Code: {}", s.dealer_code),
            format!("\tVIN: {}", s.vin),
            format!("\tDealer Name: {}", s.dealer_name.as_deref().unwrap_or(NA)),
            format!("\tEstimated Delivery: {}", or_na(&s.edd)),
            format!("\tCurrent State: {}", s.state),
        ];

        for state in LifecycleState::ALL {
            let completed = match s.completed_on(state) {
                Some(date) if !date.is_empty() => format!("Completed On {}", date),
                _ => NA.to_string(),
            };
            lines.push(format!("\t\t{}: {}", state, completed));
        }

        lines.push(format!("\tSource: {}", self.mirror));
        if let Some(outcome) = self.document {
            lines.push(format!("\tWindow Sticker: {}", outcome));
        }
        if let Some(notification) = &self.notification {
            lines.push(format!("\tEmail: {}", notification));
        }
        if self.vehicle_summary && !s.vehicle_summary.is_empty() {
            lines.push("\tVehicle Summary:".to_string());
            lines.extend(s.vehicle_summary.iter().map(|item| format!("\t\t{}", item)));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// 失败订单的报告块，如 `VIN: X, Email: e` + 原因
pub fn failure(descriptor: &OrderDescriptor, message: &str) -> String {
    format!("{}\n{}\n", descriptor, message)
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        NA
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> OrderSnapshot {
        OrderSnapshot {
            vehicle_name: "2018 F-150".to_string(),
            order_date: "01/02/2018".to_string(),
            order_number: "AB12".to_string(),
            dealer_code: "F12345".to_string(),
            vin: "1FTEW1EG0HFA12345".to_string(),
            dealer_name: None,
            edd: String::new(),
            state: LifecycleState::InProduction,
            state_dates: vec!["01/05/2018".to_string()],
            vehicle_summary: vec!["Tow Package".to_string()],
        }
    }

    #[test]
    fn test_render_fills_missing_with_na() {
        let snap = snapshot();
        let text = Report {
            snapshot: &snap,
            mirror: "https://mirror-a",
            document: Some(DocOutcome::Released),
            notification: None,
            vehicle_summary: false,
        }
        .render();

        assert!(text.starts_with("Order Information:\n"));
        assert!(text.contains("\tDealer Name: N/A\n"));
        assert!(text.contains("\tEstimated Delivery: N/A\n"));
        assert!(text.contains("\t\tIn Order Processing: Completed On 01/05/2018\n"));
        assert!(text.contains("\t\tIn Production: N/A\n"));
        assert!(text.contains("\tWindow Sticker: RELEASED\n"));
        assert!(!text.contains("Email:"));
        assert!(!text.contains("Tow Package"));
    }

    #[test]
    fn test_render_vehicle_summary() {
        let snap = snapshot();
        let text = Report {
            snapshot: &snap,
            mirror: "https://mirror-a",
            document: None,
            notification: Some("Sent".to_string()),
            vehicle_summary: true,
        }
        .render();

        assert!(text.contains("\tEmail: Sent\n"));
        assert!(text.ends_with("\tVehicle Summary:\n\t\tTow Package\n"));
    }

    #[test]
    fn test_failure_header() {
        let descriptor = OrderDescriptor::parse_line("num,AB12,F12345,a@b.com").unwrap();
        assert_eq!(
            failure(&descriptor, "Source down."),
            "Order Number: AB12, Dealer Code: F12345, Email: a@b.com\nSource down.\n"
        );
    }
}
