//! OrderCreated 事件发布器
//!
//! 通知是订单写入之外的附带效果，不属于写入的一致性边界：
//! 发布只尝试一次，失败时记录日志与指标后正常返回，从不向调用方传播错误。

use std::sync::Arc;

use order_shared::channel::EventChannel;
use order_shared::error::PublishFailure;
use order_shared::observability::metrics;
use tracing::{error, info};

use crate::models::Order;

/// 一次发布尝试的结果
///
/// 调用方可以据此做遥测或断言，但不应让它影响订单写入结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    Failed(PublishFailure),
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }

    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Failed(failure) => failure.kind(),
        }
    }
}

/// 订单事件发布器
#[derive(Clone)]
pub struct OrderEventPublisher {
    channel: Arc<dyn EventChannel>,
    topic: String,
}

impl OrderEventPublisher {
    pub fn new(channel: Arc<dyn EventChannel>, topic: impl Into<String>) -> Self {
        Self {
            channel,
            topic: topic.into(),
        }
    }

    /// 基于订单当前字段构造新的事件并尽力投递一次
    pub async fn publish_order_created(&self, order: &Order) -> PublishOutcome {
        let outcome = self.try_publish(order).await;

        match &outcome {
            PublishOutcome::Published => {
                info!(order_id = order.id, topic = %self.topic, "OrderCreated 事件已发布");
            }
            PublishOutcome::Failed(failure) => {
                error!(
                    order_id = order.id,
                    topic = %self.topic,
                    error = %failure,
                    "发布 OrderCreated 事件失败，订单创建不受影响"
                );
            }
        }

        metrics::record_event_publish(outcome.label());
        outcome
    }

    async fn try_publish(&self, order: &Order) -> PublishOutcome {
        let event = order.to_created_event();

        let payload = match event.to_payload() {
            Ok(payload) => payload,
            Err(failure) => return PublishOutcome::Failed(failure),
        };

        match self.channel.send(&self.topic, &event.key(), &payload).await {
            Ok(()) => PublishOutcome::Published,
            Err(failure) => PublishOutcome::Failed(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use order_shared::channel::InMemoryChannel;

    fn order(total: f64) -> Order {
        Order {
            id: 42,
            customer_name: "Ana".to_string(),
            created_at: Utc::now(),
            status: "CREATED".to_string(),
            total,
        }
    }

    #[tokio::test]
    async fn test_publish_sends_event() {
        let channel = InMemoryChannel::new();
        let publisher = OrderEventPublisher::new(Arc::new(channel.clone()), "orders.created");

        let outcome = publisher.publish_order_created(&order(150.50)).await;
        assert!(outcome.is_published());

        let messages = channel.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, "orders.created");
        assert_eq!(messages[0].key, "42");

        let json: serde_json::Value = serde_json::from_str(&messages[0].body).unwrap();
        assert_eq!(json["orderId"], 42);
        assert_eq!(json["customerName"], "Ana");
        assert_eq!(json["status"], "CREATED");
        assert!(json["createdAt"].is_string());
        assert!(json["eventTimestamp"].is_string());
    }

    #[tokio::test]
    async fn test_channel_outage_is_reported_not_raised() {
        let channel = InMemoryChannel::unavailable();
        let publisher = OrderEventPublisher::new(Arc::new(channel.clone()), "orders.created");

        let outcome = publisher.publish_order_created(&order(10.0)).await;

        assert!(matches!(
            outcome,
            PublishOutcome::Failed(PublishFailure::Channel(_))
        ));
        assert_eq!(outcome.label(), "channel");
        assert!(channel.is_empty());
    }

    #[tokio::test]
    async fn test_serialization_failure_skips_channel() {
        let channel = InMemoryChannel::new();
        let publisher = OrderEventPublisher::new(Arc::new(channel.clone()), "orders.created");

        let outcome = publisher.publish_order_created(&order(f64::INFINITY)).await;

        assert_eq!(outcome.label(), "serialization");
        assert!(channel.is_empty());
    }

    #[tokio::test]
    async fn test_each_publish_builds_fresh_event() {
        let channel = InMemoryChannel::new();
        let publisher = OrderEventPublisher::new(Arc::new(channel.clone()), "orders.created");
        let order = order(5.0);

        publisher.publish_order_created(&order).await;
        publisher.publish_order_created(&order).await;

        let bodies: Vec<serde_json::Value> = channel
            .messages()
            .iter()
            .map(|m| serde_json::from_str(&m.body).unwrap())
            .collect();
        assert_eq!(bodies[0]["orderId"], bodies[1]["orderId"]);
        assert_eq!(bodies[0]["createdAt"], bodies[1]["createdAt"]);
    }
}
