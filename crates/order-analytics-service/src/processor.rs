//! 订单事件处理器
//!
//! 解读单条投递的负载并裁定其去向，是系统里唯一的分支逻辑。
//! 返回类型没有错误通道：任何解析失败都在这里就地消化为
//! 永久拒绝，绝不让故障逃逸并终结消费循环。

use analytics_shared::amqp::{InboundMessage, ProcessingOutcome};
use tracing::{info, warn};

use crate::error::ConsumeError;
use crate::event::OrderEvent;

/// 订单事件处理器
///
/// 显式持有计数器句柄而非依赖隐式全局状态，
/// 便于在测试中注入可断言的计数器实现。
pub struct OrderProcessor {
    processed_orders: metrics::Counter,
    rejected_orders: metrics::Counter,
}

impl OrderProcessor {
    /// 绑定到进程级 recorder 的生产构造
    pub fn new() -> Self {
        Self {
            processed_orders: metrics::counter!("orders_processed_total"),
            rejected_orders: metrics::counter!("orders_rejected_total"),
        }
    }

    /// 注入计数器句柄的测试构造
    pub fn with_counters(processed: metrics::Counter, rejected: metrics::Counter) -> Self {
        Self {
            processed_orders: processed,
            rejected_orders: rejected,
        }
    }

    /// 裁定一条投递的去向
    ///
    /// - 负载解析成功：记录订单号（仅用于排查），处理计数器恰好 +1，确认。
    /// - 解析失败：记录原因，拒绝且不重投——坏消息重投只会无限循环。
    pub fn process(&self, msg: &InboundMessage) -> ProcessingOutcome {
        match msg.deserialize_payload::<OrderEvent>() {
            Ok(event) => {
                info!(
                    order_id = %event.order_id,
                    event = event.event.as_deref().unwrap_or("unknown"),
                    delivery_tag = msg.delivery_tag,
                    "处理订单事件"
                );
                self.processed_orders.increment(1);
                ProcessingOutcome::Acknowledge
            }
            Err(e) => {
                let err = ConsumeError::MalformedPayload {
                    reason: e.to_string(),
                };
                warn!(
                    error = %err,
                    delivery_tag = msg.delivery_tag,
                    redelivered = msg.redelivered,
                    "丢弃无法解析的投递"
                );
                self.rejected_orders.increment(1);
                ProcessingOutcome::Reject { requeue: false }
            }
        }
    }
}

impl Default for OrderProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_shared::test_utils::{CapturingCounter, capturing_counter};
    use std::sync::Arc;

    fn make_message(payload: &[u8]) -> InboundMessage {
        InboundMessage {
            queue: "orders.q".to_string(),
            delivery_tag: 1,
            redelivered: false,
            payload: payload.to_vec(),
        }
    }

    fn test_processor() -> (OrderProcessor, Arc<CapturingCounter>, Arc<CapturingCounter>) {
        let (processed, processed_captured) = capturing_counter();
        let (rejected, rejected_captured) = capturing_counter();
        (
            OrderProcessor::with_counters(processed, rejected),
            processed_captured,
            rejected_captured,
        )
    }

    #[test]
    fn test_valid_payload_is_acknowledged_and_counted_once() {
        let (processor, processed, rejected) = test_processor();

        let outcome = processor.process(&make_message(br#"{"orderId":"abc123"}"#));

        assert_eq!(outcome, ProcessingOutcome::Acknowledge);
        assert_eq!(processed.value(), 1);
        assert_eq!(rejected.value(), 0);
    }

    #[test]
    fn test_malformed_payload_is_rejected_without_requeue() {
        let (processor, processed, rejected) = test_processor();

        let outcome = processor.process(&make_message(b"not-json"));

        assert_eq!(outcome, ProcessingOutcome::Reject { requeue: false });
        assert_eq!(processed.value(), 0);
        assert_eq!(rejected.value(), 1);
    }

    #[test]
    fn test_missing_order_id_is_rejected() {
        let (processor, processed, _) = test_processor();

        let outcome = processor.process(&make_message(br#"{"event":"order.created"}"#));

        assert_eq!(outcome, ProcessingOutcome::Reject { requeue: false });
        assert_eq!(processed.value(), 0);
    }

    /// N 条合法 + M 条非法：处理计数只反映 N
    #[test]
    fn test_counter_reflects_only_successful_deliveries() {
        let (processor, processed, rejected) = test_processor();

        for i in 0..3 {
            let payload = format!(r#"{{"orderId":{i}}}"#);
            processor.process(&make_message(payload.as_bytes()));
        }
        for _ in 0..2 {
            processor.process(&make_message(b"{broken"));
        }

        assert_eq!(processed.value(), 3);
        assert_eq!(rejected.value(), 2);
    }

    /// 非 UTF-8 负载同样走拒绝路径，不会 panic
    #[test]
    fn test_invalid_utf8_payload_is_rejected() {
        let (processor, processed, rejected) = test_processor();

        let outcome = processor.process(&make_message(&[0xFF, 0xFE, 0x00]));

        assert_eq!(outcome, ProcessingOutcome::Reject { requeue: false });
        assert_eq!(processed.value(), 0);
        assert_eq!(rejected.value(), 1);
    }
}
