//! 单条消息处理
//!
//! 处理步骤依次为：解析 orderId、发送通知、回调订单服务把状态置为 NOTIFIED。
//! 通知发送失败只记录在结果中，不阻止回调；回调失败则整条消息失败。
//! 回调失败时不撤销已发送的通知。

use std::sync::Arc;

use order_shared::events::order_status;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::NotificationError;
use crate::notifier::{DispatchOutcome, Notifier};
use crate::status_client::{StatusResponse, StatusUpdater};

/// 单条消息成功处理的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedMessage {
    pub order_id: i64,
    pub dispatch: DispatchOutcome,
    pub callback: StatusResponse,
}

/// 从消息体中提取订单 ID
///
/// 消息体必须是 JSON 对象，且 `orderId` 为整数；其他字段忽略。
pub fn extract_order_id(body: &str) -> Result<i64, NotificationError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| NotificationError::Parse(format!("消息体不是合法 JSON: {e}")))?;

    let Value::Object(fields) = value else {
        return Err(NotificationError::Parse("消息体不是 JSON 对象".to_string()));
    };

    match fields.get("orderId") {
        None | Some(Value::Null) => Err(NotificationError::Parse("缺少 orderId 字段".to_string())),
        Some(id) => id
            .as_i64()
            .ok_or_else(|| NotificationError::Parse(format!("orderId 不是整数: {id}"))),
    }
}

/// 消息处理器
///
/// 不持有跨消息的可变状态，同一批次内的消息可以并发处理。
pub struct MessageProcessor {
    notifier: Arc<dyn Notifier>,
    status_updater: Arc<dyn StatusUpdater>,
}

impl MessageProcessor {
    pub fn new(notifier: Arc<dyn Notifier>, status_updater: Arc<dyn StatusUpdater>) -> Self {
        Self {
            notifier,
            status_updater,
        }
    }

    pub async fn process(&self, body: &str) -> Result<ProcessedMessage, NotificationError> {
        debug!(body, "处理消息");

        let order_id = extract_order_id(body)?;

        let dispatch = match self.notifier.notify(order_id).await {
            Ok(message_id) => DispatchOutcome::Sent { message_id },
            Err(e) => {
                warn!(order_id, error = %e, "通知发送失败，继续更新订单状态");
                DispatchOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        };

        let callback = self
            .status_updater
            .update_status(order_id, order_status::NOTIFIED)
            .await?;

        info!(order_id, "订单已标记为 NOTIFIED");

        Ok(ProcessedMessage {
            order_id,
            dispatch,
            callback,
        })
    }
}
