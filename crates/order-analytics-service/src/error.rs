//! 订单分析服务专用错误类型
//!
//! 在共享库 AnalyticsError 基础上定义本服务特有的错误变体。
//! 注意"负载非法"只是一个分类标签：它在处理边界内被就地消化为
//! 永久拒绝，从不让消费循环因为单条坏消息而终止。

use analytics_shared::error::AnalyticsError;

/// 订单事件消费错误
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    /// 负载无法解析为订单事件，投递被永久丢弃
    #[error("负载非法: {reason}")]
    MalformedPayload { reason: String },

    /// 透传共享库错误，避免在每个 match 分支手动转换
    #[error(transparent)]
    Shared(#[from] AnalyticsError),
}
