//! 统一可观测性模块
//!
//! 提供 metrics 与 logging 的统一初始化。与把指标放在独立端口的做法不同，
//! 本服务的 `/metrics` 由控制面路由直接提供，因此初始化只安装 recorder
//! 并把渲染句柄交还给调用方。

pub mod metrics;
pub mod middleware;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// 服务名称，用于标识指标的来源
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// 日志级别（如 "info", "debug"）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 是否启用 JSON 格式日志
    #[serde(default)]
    pub json_logs: bool,
}

fn default_service_name() -> String {
    "unknown-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    /// 注入服务名，配置文件里的 observability 段不包含该字段
    pub fn with_service_name(mut self, service_name: &str) -> Self {
        self.service_name = service_name.to_string();
        self
    }
}

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics（Prometheus recorder）
///
/// 返回的 `PrometheusHandle` 交给控制面路由渲染 `/metrics`。
pub fn init(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    tracing::init(config)?;

    let handle = metrics::init_recorder(&config.service_name)?;

    info!(
        service = %config.service_name,
        log_level = %config.log_level,
        "Observability initialized"
    );

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
        assert_eq!(config.service_name, "unknown-service");
    }

    #[test]
    fn test_with_service_name() {
        let config = ObservabilityConfig::default().with_service_name("order-analytics-service");
        assert_eq!(config.service_name, "order-analytics-service");
    }
}
