//! 订单分析服务入口
//!
//! 启动顺序：加载配置 -> 初始化可观测性 -> 连接 broker（失败即退出）
//! -> 在后台任务上启动消费循环 -> 控制面开始服务。
//! 消费循环终止不会让进程退出，存活探针仍按既有契约返回 UP。

use analytics_shared::config::AppConfig;
use analytics_shared::observability;
use order_analytics_service::consumer::OrderConsumer;
use order_analytics_service::processor::OrderProcessor;
use order_analytics_service::server;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 统一加载配置：config/{service_name}.toml 及 ANALYTICS_ 环境变量覆盖
    let config = AppConfig::load("order-analytics-service").unwrap_or_default();

    let obs_config = config
        .observability
        .clone()
        .with_service_name("order-analytics-service");
    let metrics_handle = observability::init(&obs_config)?;

    info!("Starting order-analytics-service on {}", config.server_addr());

    // 建立 broker 连接：启动期连接失败对消费路径是致命的，直接退出
    let processor = OrderProcessor::new();
    let consumer = OrderConsumer::connect(&config.amqp, processor).await?;

    // 消费循环在独立后台任务上运行，broker 停摆不会阻塞控制面
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_task = tokio::spawn(async move {
        if let Err(e) = consumer.run(shutdown_rx).await {
            // 循环终止只记录日志；进程与存活探针维持原状
            error!(error = %e, "消费循环已终止");
        }
    });

    let app = server::control_router(metrics_handle);
    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM（K8s 停止 Pod）或 Ctrl+C 时，
    // 停止接收新连接并通知消费循环退出
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = consumer_task.await;

    info!("Server shutdown complete");
    Ok(())
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
/// 收到任一信号后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
