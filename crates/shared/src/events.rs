//! 事件模型
//!
//! 定义订单服务与通知工作者之间通过消息通道传递的事件格式。
//! 两端只通过序列化后的 JSON 交互，不共享内存或锁。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PublishFailure;

/// 订单状态取值
///
/// 状态在存储中是自由字符串，这里只集中列出系统内已知的取值。
pub mod order_status {
    pub const CREATED: &str = "CREATED";
    pub const NOTIFIED: &str = "NOTIFIED";
    pub const PROCESSING: &str = "PROCESSING";
    pub const COMPLETED: &str = "COMPLETED";
}

// ---------------------------------------------------------------------------
// OrderCreatedEvent
// ---------------------------------------------------------------------------

/// 订单创建事件
///
/// 每次发布尝试构造一个新实例，序列化一次后即丢弃。
/// `event_timestamp` 总是构造时刻，用于区分业务数据相同的重复投递副本；
/// 如需重发必须重新构造事件以获得新的时间戳。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedEvent {
    pub order_id: i64,
    pub customer_name: String,
    pub total: f64,
    /// 发布时刻的订单状态
    pub status: String,
    /// 订单创建时间
    pub created_at: DateTime<Utc>,
    /// 事件产生时间
    pub event_timestamp: DateTime<Utc>,
}

impl OrderCreatedEvent {
    /// 从已持久化订单的字段快照构造事件
    pub fn new(
        order_id: i64,
        customer_name: impl Into<String>,
        total: f64,
        status: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            customer_name: customer_name.into(),
            total,
            status: status.into(),
            created_at,
            event_timestamp: Utc::now(),
        }
    }

    /// 消息 key，保证同一订单的事件落在同一分区
    pub fn key(&self) -> String {
        self.order_id.to_string()
    }

    /// 序列化为消息体
    ///
    /// 非有限的金额（NaN / 无穷）无法表示为 JSON 数字，直接报序列化失败，
    /// 避免向下游写入 `null` 金额。
    pub fn to_payload(&self) -> Result<Vec<u8>, PublishFailure> {
        if !self.total.is_finite() {
            return Err(PublishFailure::Serialization(format!(
                "total 不是有限数值: {}",
                self.total
            )));
        }
        serde_json::to_vec(self).map_err(|e| PublishFailure::Serialization(e.to_string()))
    }
}
