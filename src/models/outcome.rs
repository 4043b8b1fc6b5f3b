/// 单个订单本轮检查的结果类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeClass {
    /// 检查成功
    Success,
    /// 上游明确表示订单不存在或输入无效
    Unavailable,
    /// 所有镜像耗尽或页面结构缺失
    SourceDown,
}

/// 单个订单的轮询结果，由工作池写入对应的输出槽位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub class: OutcomeClass,
    pub report: String,
    /// 订单已处于终态 Delivered，可以从跟踪列表中移除
    pub delivered: bool,
}

impl PollOutcome {
    pub fn success(report: String, delivered: bool) -> Self {
        Self {
            class: OutcomeClass::Success,
            report,
            delivered,
        }
    }

    pub fn unavailable(report: String) -> Self {
        Self {
            class: OutcomeClass::Unavailable,
            report,
            delivered: false,
        }
    }

    pub fn source_down(report: String) -> Self {
        Self {
            class: OutcomeClass::SourceDown,
            report,
            delivered: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.class == OutcomeClass::Success
    }
}
