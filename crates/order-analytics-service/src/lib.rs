//! 订单分析服务
//!
//! 从持久化队列 `orders.q` 消费订单事件，逐条解析并累计处理指标，
//! 同时在 8082 端口提供存活探针与 Prometheus 指标抓取端点。
//! 消费循环与控制面互相独立，仅通过指标 recorder 共享状态。

pub mod consumer;
pub mod error;
pub mod event;
pub mod processor;
pub mod server;
