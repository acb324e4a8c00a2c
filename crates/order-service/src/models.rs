//! 订单数据模型

use chrono::{DateTime, Utc};
use order_shared::events::{OrderCreatedEvent, order_status};
use serde::{Deserialize, Serialize};

/// 订单
///
/// `id` 与 `created_at` 由存储在首次持久化时分配，之后不再变化；
/// `status` 只通过显式的状态更新修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub total: f64,
}

impl Order {
    /// 当前字段值的事件快照
    pub fn to_created_event(&self) -> OrderCreatedEvent {
        OrderCreatedEvent::new(
            self.id,
            self.customer_name.clone(),
            self.total,
            self.status.clone(),
            self.created_at,
        )
    }
}

/// 创建订单请求
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_name: String,
    pub total: f64,
    /// 缺省时使用 CREATED，提供时原样保存
    #[serde(default)]
    pub status: Option<String>,
}

impl NewOrder {
    pub fn new(customer_name: impl Into<String>, total: f64) -> Self {
        Self {
            customer_name: customer_name.into(),
            total,
            status: None,
        }
    }

    /// 持久化时使用的初始状态
    pub fn initial_status(&self) -> String {
        self.status
            .clone()
            .unwrap_or_else(|| order_status::CREATED.to_string())
    }
}

/// 更新订单状态请求
///
/// 字段可缺省，以便把缺失与空白统一报告为参数错误而不是反序列化失败。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_defaults_to_created() {
        assert_eq!(NewOrder::new("Ana", 150.50).initial_status(), "CREATED");

        let explicit = NewOrder {
            status: Some("PROCESSING".to_string()),
            ..NewOrder::new("Ana", 1.0)
        };
        assert_eq!(explicit.initial_status(), "PROCESSING");
    }

    #[test]
    fn test_initial_status_kept_verbatim() {
        for status in [" PROCESSING ", "   ", "notified"] {
            let order = NewOrder {
                status: Some(status.to_string()),
                ..NewOrder::new("Ana", 1.0)
            };
            assert_eq!(order.initial_status(), status);
        }
    }

    #[test]
    fn test_new_order_deserialize_camel_case() {
        let req: NewOrder =
            serde_json::from_str(r#"{"customerName":"Ana","total":150.50}"#).unwrap();
        assert_eq!(req.customer_name, "Ana");
        assert!((req.total - 150.50).abs() < f64::EPSILON);
        assert!(req.status.is_none());
    }

    #[test]
    fn test_order_serialize_camel_case() {
        let order = Order {
            id: 1,
            customer_name: "Ana".to_string(),
            created_at: Utc::now(),
            status: "CREATED".to_string(),
            total: 10.0,
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["customerName"], "Ana");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_created_event_snapshot() {
        let order = Order {
            id: 9,
            customer_name: "Ana".to_string(),
            created_at: Utc::now(),
            status: "CREATED".to_string(),
            total: 150.50,
        };
        let event = order.to_created_event();
        assert_eq!(event.order_id, 9);
        assert_eq!(event.status, "CREATED");
        assert_eq!(event.created_at, order.created_at);
    }
}
