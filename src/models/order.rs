use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;

const VIN_LEN: usize = 17;
const ORDER_NUMBER_LEN: usize = 4;
const DEALER_CODE_LEN: usize = 6;

/// 订单标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKey {
    /// 17 位车架号
    Vin(String),
    /// 4 位订单号 + 6 位经销商代码
    NumberAndDealer {
        order_number: String,
        dealer_code: String,
    },
}

/// 被跟踪的订单（订单标识 + 可选通知邮箱）
///
/// 同一订单配不同邮箱是两个独立的跟踪对象，各有各的持久化记录
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderDescriptor {
    pub key: OrderKey,
    pub email: Option<String>,
}

impl OrderDescriptor {
    pub fn vin(vin: impl Into<String>, email: Option<String>) -> Result<Self, InputError> {
        let vin = vin.into().trim().to_uppercase();
        if !is_alnum_of_len(&vin, VIN_LEN) {
            return Err(malformed(
                &format!("vin,{}", vin),
                "VIN 必须是 17 位字母数字",
            ));
        }
        Ok(Self {
            key: OrderKey::Vin(vin),
            email: normalize_email(email),
        })
    }

    pub fn number_and_dealer(
        order_number: impl Into<String>,
        dealer_code: impl Into<String>,
        email: Option<String>,
    ) -> Result<Self, InputError> {
        let order_number = order_number.into().trim().to_uppercase();
        let dealer_code = dealer_code.into().trim().to_uppercase();
        if !is_alnum_of_len(&order_number, ORDER_NUMBER_LEN) {
            return Err(malformed(
                &format!("num,{},{}", order_number, dealer_code),
                "订单号必须是 4 位字母数字",
            ));
        }
        if !is_alnum_of_len(&dealer_code, DEALER_CODE_LEN) {
            return Err(malformed(
                &format!("num,{},{}", order_number, dealer_code),
                "经销商代码必须是 6 位字母数字",
            ));
        }
        Ok(Self {
            key: OrderKey::NumberAndDealer {
                order_number,
                dealer_code,
            },
            email: normalize_email(email),
        })
    }

    /// 解析订单列表中的一行
    ///
    /// 格式：`vin,<VIN>[,<email>]` 或 `num,<订单号>,<经销商代码>[,<email>]`，
    /// 行内所有空白字符都会被去掉
    pub fn parse_line(line: &str) -> Result<Self, InputError> {
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let fields: Vec<&str> = compact.split(',').collect();

        match fields[0].to_lowercase().as_str() {
            "vin" => match fields.len() {
                2 => Self::vin(fields[1], None),
                3 => Self::vin(fields[1], Some(fields[2].to_string())),
                _ => Err(malformed(&compact, "VIN 订单需要 2 或 3 个字段")),
            },
            "num" => match fields.len() {
                3 => Self::number_and_dealer(fields[1], fields[2], None),
                4 => Self::number_and_dealer(fields[1], fields[2], Some(fields[3].to_string())),
                _ => Err(malformed(&compact, "订单号订单需要 3 或 4 个字段")),
            },
            _ => Err(malformed(&compact, "未知的订单类型")),
        }
    }

    /// 规范化后的列表行，也是去重用的身份字符串
    pub fn canonical(&self) -> String {
        let mut fields = match &self.key {
            OrderKey::Vin(vin) => vec!["vin".to_string(), vin.clone()],
            OrderKey::NumberAndDealer {
                order_number,
                dealer_code,
            } => vec!["num".to_string(), order_number.clone(), dealer_code.clone()],
        };
        if let Some(email) = &self.email {
            fields.push(email.clone());
        }
        fields.join(",")
    }

    /// 上游查询参数
    pub fn query(&self) -> Vec<(String, String)> {
        let mut query = vec![("freshLoaded".to_string(), "true".to_string())];
        match &self.key {
            OrderKey::Vin(vin) => {
                query.push(("orderTrackingInputType".to_string(), "vin".to_string()));
                query.push(("vin".to_string(), vin.clone()));
            }
            OrderKey::NumberAndDealer {
                order_number,
                dealer_code,
            } => {
                query.push((
                    "orderTrackingInputType".to_string(),
                    "orderNumberInput".to_string(),
                ));
                query.push(("orderNumber".to_string(), order_number.clone()));
                query.push(("dealerCode".to_string(), dealer_code.clone()));
                query.push(("customerLastName".to_string(), "xxx".to_string()));
            }
        }
        query
    }

    /// 通知邮件中使用的订单描述，如 `VIN, 1FTEW1EG0HFA00000, a@b.com`
    pub fn info(&self) -> String {
        let mut parts = match &self.key {
            OrderKey::Vin(vin) => vec!["VIN".to_string(), vin.clone()],
            OrderKey::NumberAndDealer {
                order_number,
                dealer_code,
            } => vec![
                "Order Number & Dealer Code".to_string(),
                order_number.clone(),
                dealer_code.clone(),
            ],
        };
        if let Some(email) = &self.email {
            parts.push(email.clone());
        }
        parts.join(", ")
    }
}

impl fmt::Display for OrderDescriptor {
    /// 报告中失败订单的抬头
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            OrderKey::Vin(vin) => write!(f, "VIN: {}", vin)?,
            OrderKey::NumberAndDealer {
                order_number,
                dealer_code,
            } => write!(
                f,
                "Order Number: {}, Dealer Code: {}",
                order_number, dealer_code
            )?,
        }
        if let Some(email) = &self.email {
            write!(f, ", Email: {}", email)?;
        }
        Ok(())
    }
}

fn normalize_email(email: Option<String>) -> Option<String> {
    email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
}

fn is_alnum_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_alphanumeric())
}

fn malformed(line: &str, reason: &str) -> InputError {
    InputError::MalformedLine {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}
