//! 通知发送
//!
//! 通过 `Notifier` trait 抽象"通知客户"这一副作用。当前实现为模拟发送
//! （固定延迟 + 日志），替换为邮件、短信或推送服务商时只需实现同一 trait。

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::NotificationError;

/// 一次通知发送的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 外部渠道返回的消息标识
    Sent { message_id: String },
    /// 发送失败但不影响后续的状态回调
    Skipped { reason: String },
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// 通知发送器
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, order_id: i64) -> Result<String, NotificationError>;
}

/// 模拟通知发送器
///
/// 以固定延迟代替真实的外部调用，延迟时间有上限，不会无限阻塞。
#[derive(Debug, Clone)]
pub struct SimulatedNotifier {
    delay: Duration,
}

impl SimulatedNotifier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedNotifier {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[async_trait]
impl Notifier for SimulatedNotifier {
    async fn notify(&self, order_id: i64) -> Result<String, NotificationError> {
        let message_id = Uuid::now_v7().to_string();

        info!(
            order_id,
            message_id = %message_id,
            delay_ms = self.delay.as_millis() as u64,
            "模拟发送订单通知"
        );

        tokio::time::sleep(self.delay).await;

        Ok(message_id)
    }
}
