//! 控制面路由
//!
//! 固定回答两个请求：存活探针 `/health` 与指标抓取 `/metrics`。
//! 生命周期独立于消费循环——进程起来后 `/health` 即返回 UP，
//! 不反映消费循环或 broker 连接的健康状况（沿用既有部署契约）。

use axum::{Json, Router, http::header, middleware, routing::get};
use metrics_exporter_prometheus::PrometheusHandle;

use analytics_shared::observability::metrics::PROMETHEUS_CONTENT_TYPE;
use analytics_shared::observability::middleware as obs_middleware;

/// 构建控制面路由
pub fn control_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/metrics",
            get(move || std::future::ready(render_metrics(&handle))),
        )
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
}

/// 存活探针：进程正常即返回 UP
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "UP" }))
}

/// 渲染 Prometheus exposition 快照
fn render_metrics(handle: &PrometheusHandle) -> ([(header::HeaderName, &'static str); 1], String) {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        handle.render(),
    )
}
