//! 统一错误处理模块
//!
//! 定义各模块共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum AnalyticsError {
    // ==================== AMQP 错误 ====================
    #[error("AMQP 错误: {0}")]
    Amqp(String),

    // ==================== 配置错误 ====================
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== 序列化错误 ====================
    #[error("负载反序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, AnalyticsError>;

impl AnalyticsError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Amqp(_) => "AMQP_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 反序列化与配置错误是确定性失败，重试没有意义。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Amqp(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = AnalyticsError::Amqp("broker 不可达".to_string());
        assert_eq!(err.code(), "AMQP_ERROR");

        let err = AnalyticsError::Internal("unexpected".to_string());
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_is_retryable() {
        let amqp_err = AnalyticsError::Amqp("连接中断".to_string());
        assert!(amqp_err.is_retryable());

        let parse_err: AnalyticsError = serde_json::from_str::<serde_json::Value>("not-json")
            .unwrap_err()
            .into();
        assert!(!parse_err.is_retryable());
        assert_eq!(parse_err.code(), "SERIALIZATION_ERROR");
    }
}
