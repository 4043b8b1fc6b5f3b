use serde::{Deserialize, Serialize};

/// 订单生命周期状态
///
/// 顺序固定：`OrderProcessing < InProduction < AwaitingShipment < InTransit < Delivered`，
/// 但状态变化只按相等比较，不按先后
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    OrderProcessing,
    InProduction,
    AwaitingShipment,
    InTransit,
    Delivered,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 5] = [
        LifecycleState::OrderProcessing,
        LifecycleState::InProduction,
        LifecycleState::AwaitingShipment,
        LifecycleState::InTransit,
        LifecycleState::Delivered,
    ];

    /// 在状态日期列表中的下标
    pub fn index(self) -> usize {
        self as usize
    }

    /// 显示名称
    pub fn name(self) -> &'static str {
        match self {
            LifecycleState::OrderProcessing => "In Order Processing",
            LifecycleState::InProduction => "In Production",
            LifecycleState::AwaitingShipment => "Awaiting Shipment",
            LifecycleState::InTransit => "In Transit",
            LifecycleState::Delivered => "Delivered",
        }
    }

    /// 从上游页面的步骤名解析（宽松匹配）
    pub fn from_upstream(text: &str) -> Option<Self> {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        if text.contains("delivered") {
            return Some(LifecycleState::Delivered);
        }
        if text.contains("transit") {
            return Some(LifecycleState::InTransit);
        }
        if text.contains("shipment") || text.contains("awaiting") {
            return Some(LifecycleState::AwaitingShipment);
        }
        if text.contains("production") {
            return Some(LifecycleState::InProduction);
        }
        if text.contains("processing") || text.contains("order") {
            return Some(LifecycleState::OrderProcessing);
        }
        None
    }

    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Delivered
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 某一时刻从上游抓到的订单事实，每次轮询重新生成，不修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub vehicle_name: String,
    pub order_date: String,
    pub order_number: String,
    pub dealer_code: String,
    pub vin: String,
    /// 上游有时不给经销商名称
    pub dealer_name: Option<String>,
    /// 预计交付日期，空字符串表示未知或已被移除
    pub edd: String,
    pub state: LifecycleState,
    /// 与 `LifecycleState::ALL` 按下标对齐，尚未到达的状态没有日期
    pub state_dates: Vec<String>,
    #[serde(default)]
    pub vehicle_summary: Vec<String>,
}

impl OrderSnapshot {
    /// 某个状态的完成日期
    pub fn completed_on(&self, state: LifecycleState) -> Option<&str> {
        self.state_dates.get(state.index()).map(String::as_str)
    }
}
