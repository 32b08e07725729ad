//! 订单事件模型
//!
//! 订单服务发布的事件信封。上游以 camelCase 序列化，
//! 除 `orderId` 外的字段均为可选——它们只服务于日志与排查，
//! 不参与控制流。

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 订单标识
///
/// 上游 Java 服务发布的是数字 id，历史消息和人工注入的测试消息
/// 则可能是字符串，两种形态都接受。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// 订单事件
///
/// 缺失 `orderId` 的负载不是订单事件，反序列化直接失败。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub order_id: OrderId,
    /// 事件名，如 "order.created"
    #[serde(default)]
    pub event: Option<String>,
    /// 事件格式版本
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub total: Option<f64>,
    /// 上游以本地时间（无时区）序列化
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}
