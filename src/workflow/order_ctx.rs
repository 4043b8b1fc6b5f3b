//! 订单处理上下文
//!
//! 封装"我正在处理列表里的第几个订单"这一信息

use crate::models::OrderDescriptor;
use std::fmt::Display;

/// 订单处理上下文
#[derive(Debug, Clone)]
pub struct OrderCtx {
    /// 在本轮工作列表中的下标（从 0 开始，决定输出顺序）
    pub index: usize,

    pub descriptor: OrderDescriptor,
}

impl OrderCtx {
    pub fn new(index: usize, descriptor: OrderDescriptor) -> Self {
        Self { index, descriptor }
    }
}

impl Display for OrderCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[订单 {} {}]", self.index + 1, self.descriptor.info())
    }
}
