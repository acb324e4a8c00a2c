//! 订单通知工作者
//!
//! 从 Kafka 批量消费订单创建事件，对每条消息模拟发送客户通知，
//! 随后回调订单服务把订单状态置为 NOTIFIED。单条消息失败不影响同批其他消息。

pub mod consumer;
pub mod error;
pub mod notifier;
pub mod processor;
pub mod status_client;
