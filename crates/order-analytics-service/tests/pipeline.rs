//! 处理管道与控制面的端到端测试
//!
//! 不依赖真实 broker：投递直接构造，指标走局部 recorder，
//! 控制面路由用 tower 的 oneshot 驱动。

use analytics_shared::amqp::{InboundMessage, ProcessingOutcome};
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusBuilder;
use order_analytics_service::processor::OrderProcessor;
use order_analytics_service::server::control_router;
use tower::ServiceExt;

fn make_message(tag: u64, payload: &[u8]) -> InboundMessage {
    InboundMessage {
        queue: "orders.q".to_string(),
        delivery_tag: tag,
        redelivered: false,
        payload: payload.to_vec(),
    }
}

/// N 条合法 + M 条非法投递后，exposition 中的处理计数等于 N
#[tokio::test]
async fn test_metrics_exposition_reflects_processed_orders() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    metrics::with_local_recorder(&recorder, || {
        let processor = OrderProcessor::new();

        for i in 0..3u64 {
            let payload = format!(r#"{{"orderId":{i}}}"#);
            let outcome = processor.process(&make_message(i + 1, payload.as_bytes()));
            assert_eq!(outcome, ProcessingOutcome::Acknowledge);
        }
        for i in 0..2u64 {
            let outcome = processor.process(&make_message(i + 4, b"not-json"));
            assert_eq!(outcome, ProcessingOutcome::Reject { requeue: false });
        }
    });

    let response = control_router(handle)
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(
        text.contains("orders_processed_total 3"),
        "exposition 应报告 3 条已处理订单:\n{text}"
    );
    assert!(
        text.contains("orders_rejected_total 2"),
        "exposition 应报告 2 条被丢弃投递:\n{text}"
    );
}

/// 尚未处理任何投递时探针即返回 UP，与消费状态无关
#[tokio::test]
async fn test_health_is_up_before_any_delivery() {
    let recorder = PrometheusBuilder::new().build_recorder();

    let response = control_router(recorder.handle())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "UP");
}
