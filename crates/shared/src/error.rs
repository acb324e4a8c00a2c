//! 统一错误处理模块
//!
//! 定义系统中所有共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    // ==================== 验证错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    // ==================== Kafka 错误 ====================
    #[error("Kafka 错误: {0}")]
    Kafka(String),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, OrderError>;

impl OrderError {
    /// 订单不存在
    pub fn order_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "Order".to_string(),
            id: id.to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Kafka(_) => "KAFKA_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Kafka(_))
    }
}

/// 事件发布失败
///
/// 生产者侧的失败分类，只用于日志与指标，从不向写路径的调用方传播。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishFailure {
    #[error("事件序列化失败: {0}")]
    Serialization(String),

    #[error("消息通道不可用: {0}")]
    Channel(String),
}

impl PublishFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "serialization",
            Self::Channel(_) => "channel",
        }
    }
}
