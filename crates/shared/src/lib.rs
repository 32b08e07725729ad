//! 共享库
//!
//! 包含订单分析服务所需的配置、错误处理、AMQP 基础设施与可观测性代码。

pub mod amqp;
pub mod config;
pub mod error;
pub mod observability;
pub mod test_utils;
