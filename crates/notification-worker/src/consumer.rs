//! 批量通知消费者
//!
//! 每批消息逐条交给 `MessageProcessor`，单条消息的失败（包括 panic）
//! 只计为该消息的失败结果，不会中断同批其他消息，也不会让整批调用失败。
//! 批次结果由各条消息的结果折叠而来。

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt, stream};
use order_shared::config::{KafkaConfig, NotificationConfig};
use order_shared::kafka::KafkaConsumer;
use order_shared::observability::metrics;
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::NotificationError;
use crate::processor::MessageProcessor;

/// 单条消息的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Succeeded {
        order_id: i64,
    },
    Failed {
        /// 原始消息体，供事后排查
        body: String,
        error: String,
        retryable: bool,
    },
}

impl MessageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// 批次汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// 与输入批次一一对应、顺序一致
    pub outcomes: Vec<MessageOutcome>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// 失败的消息，未来接入死信队列时从这里取
    pub fn failures(&self) -> impl Iterator<Item = &MessageOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

impl FromIterator<MessageOutcome> for BatchSummary {
    fn from_iter<I: IntoIterator<Item = MessageOutcome>>(iter: I) -> Self {
        iter.into_iter()
            .fold(BatchSummary::default(), |mut summary, outcome| {
                if outcome.is_success() {
                    summary.succeeded += 1;
                } else {
                    summary.failed += 1;
                }
                summary.outcomes.push(outcome);
                summary
            })
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

/// 批量通知消费者
pub struct BatchNotificationConsumer {
    processor: Arc<MessageProcessor>,
    /// 批内并发度，1 表示严格顺序处理
    concurrency: usize,
}

impl BatchNotificationConsumer {
    pub fn new(processor: Arc<MessageProcessor>) -> Self {
        Self {
            processor,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// 处理一批消息体
    ///
    /// 每条消息恰好尝试一次，返回的汇总中成功数与失败数之和等于批次大小。
    pub async fn handle<S: AsRef<str>>(&self, batch: &[S]) -> BatchSummary {
        info!(size = batch.len(), "收到消息批次");

        let summary: BatchSummary = stream::iter(batch)
            .map(|body| self.process_isolated(body.as_ref()))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect();

        metrics::record_notification_batch(summary.succeeded, summary.failed);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "批次处理完成: {summary}"
        );

        summary
    }

    async fn process_isolated(&self, body: &str) -> MessageOutcome {
        let result = AssertUnwindSafe(self.processor.process(body))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(processed)) => MessageOutcome::Succeeded {
                order_id: processed.order_id,
            },
            Ok(Err(e)) => failed(body, &e),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(body, panic = %reason, "处理消息时发生 panic");
                MessageOutcome::Failed {
                    body: body.to_string(),
                    error: format!("panic: {reason}"),
                    retryable: false,
                }
            }
        }
    }
}

fn failed(body: &str, err: &NotificationError) -> MessageOutcome {
    error!(
        body,
        error = %err,
        kind = err.kind(),
        retryable = err.is_retryable(),
        "处理消息失败"
    );
    MessageOutcome::Failed {
        body: body.to_string(),
        error: err.to_string(),
        retryable: err.is_retryable(),
    }
}

/// Kafka 驱动的通知工作者
///
/// 从订单事件 topic 拉取消息，凑批后交给 `BatchNotificationConsumer`。
/// offset 自动提交，失败消息不会重新投递，只体现在日志与指标中。
pub struct NotificationWorker {
    consumer: KafkaConsumer,
    topic: String,
    batch_consumer: BatchNotificationConsumer,
    batch_size: usize,
    batch_window: std::time::Duration,
}

impl NotificationWorker {
    pub fn new(
        kafka: &KafkaConfig,
        notification: &NotificationConfig,
        batch_consumer: BatchNotificationConsumer,
    ) -> Result<Self, NotificationError> {
        let consumer = KafkaConsumer::new(kafka)?;
        Ok(Self {
            consumer,
            topic: kafka.order_events_topic.clone(),
            batch_consumer,
            batch_size: notification.batch_size,
            batch_window: notification.batch_window(),
        })
    }

    /// 启动消费循环，直到收到 shutdown 信号
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), NotificationError> {
        self.consumer.subscribe(&[self.topic.as_str()])?;

        info!(topic = %self.topic, "通知工作者已启动");

        let batch_consumer = &self.batch_consumer;
        self.consumer
            .start_batched(shutdown, self.batch_size, self.batch_window, |messages| {
                async move {
                    let bodies: Vec<String> = messages.iter().map(|m| m.body_lossy()).collect();
                    batch_consumer.handle(&bodies).await;
                }
            })
            .await;

        info!("通知工作者已停止");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::SimulatedNotifier;
    use crate::status_client::{StatusResponse, StatusUpdater};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// 按订单 ID 决定回调结果的替身
    #[derive(Default)]
    struct ScriptedUpdater {
        reject: Vec<i64>,
        panic_on: Vec<i64>,
        calls: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl StatusUpdater for ScriptedUpdater {
        async fn update_status(
            &self,
            order_id: i64,
            _status: &str,
        ) -> Result<StatusResponse, NotificationError> {
            self.calls.lock().push(order_id);
            if self.panic_on.contains(&order_id) {
                panic!("callback exploded for {order_id}");
            }
            if self.reject.contains(&order_id) {
                return Err(NotificationError::RemoteRejection {
                    status: 500,
                    body: "internal error".to_string(),
                });
            }
            Ok(StatusResponse {
                status: 200,
                body: String::new(),
            })
        }
    }

    fn consumer(updater: Arc<ScriptedUpdater>) -> BatchNotificationConsumer {
        let processor = MessageProcessor::new(
            Arc::new(SimulatedNotifier::new(Duration::ZERO)),
            updater,
        );
        BatchNotificationConsumer::new(Arc::new(processor))
    }

    #[tokio::test]
    async fn test_single_message_success() {
        let updater = Arc::new(ScriptedUpdater::default());
        let summary = consumer(updater.clone())
            .handle(&[r#"{"orderId": 1}"#])
            .await;

        assert_eq!(summary.to_string(), "1 succeeded, 0 failed");
        assert_eq!(*updater.calls.lock(), vec![1]);
    }

    #[tokio::test]
    async fn test_single_message_rejected() {
        let updater = Arc::new(ScriptedUpdater {
            reject: vec![1],
            ..Default::default()
        });
        let summary = consumer(updater).handle(&[r#"{"orderId": 1}"#]).await;

        assert_eq!(summary.to_string(), "0 succeeded, 1 failed");
        match &summary.outcomes[0] {
            MessageOutcome::Failed {
                body, retryable, ..
            } => {
                assert_eq!(body, r#"{"orderId": 1}"#);
                assert!(*retryable);
            }
            other => panic!("期望失败结果，实际 {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_message_does_not_abort_batch() {
        let updater = Arc::new(ScriptedUpdater::default());
        let batch = [
            r#"{"orderId": 1}"#,
            r#"{"orderId": "not-a-number"}"#,
            r#"{"orderId": 3}"#,
        ];

        let summary = consumer(updater.clone()).handle(&batch).await;

        assert_eq!(summary.to_string(), "2 succeeded, 1 failed");
        assert!(!summary.outcomes[1].is_success());
        assert_eq!(*updater.calls.lock(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let updater = Arc::new(ScriptedUpdater {
            panic_on: vec![2],
            ..Default::default()
        });
        let batch = [
            r#"{"orderId": 1}"#,
            r#"{"orderId": 2}"#,
            r#"{"orderId": 3}"#,
        ];

        let summary = consumer(updater.clone()).handle(&batch).await;

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        match &summary.outcomes[1] {
            MessageOutcome::Failed { error, .. } => assert!(error.contains("exploded")),
            other => panic!("期望失败结果，实际 {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_counts_always_match_batch_size() {
        let updater = Arc::new(ScriptedUpdater {
            reject: vec![4],
            ..Default::default()
        });
        let batch: Vec<String> = vec![
            "".to_string(),
            "garbage".to_string(),
            r#"{"orderId": 4}"#.to_string(),
            r#"{"orderId": 5, "status": "CREATED"}"#.to_string(),
            r#"{"total": 1}"#.to_string(),
        ];

        for concurrency in [1, 3] {
            let summary = consumer(updater.clone())
                .with_concurrency(concurrency)
                .handle(&batch)
                .await;
            assert_eq!(summary.total(), batch.len());
            assert_eq!(summary.succeeded, 1);
            assert_eq!(summary.failures().count(), 4);
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let updater = Arc::new(ScriptedUpdater::default());
        let empty: [&str; 0] = [];
        let summary = consumer(updater).handle(&empty).await;
        assert_eq!(summary.to_string(), "0 succeeded, 0 failed");
    }

    #[tokio::test]
    async fn test_duplicate_delivery_processed_each_time() {
        let updater = Arc::new(ScriptedUpdater::default());
        let consumer = consumer(updater.clone());
        let message = [r#"{"orderId": 8}"#];

        let first = consumer.handle(&message).await;
        let second = consumer.handle(&message).await;

        assert_eq!(first.to_string(), "1 succeeded, 0 failed");
        assert_eq!(second.to_string(), "1 succeeded, 0 failed");
        assert_eq!(*updater.calls.lock(), vec![8, 8]);
    }

    #[test]
    fn test_summary_fold() {
        let summary: BatchSummary = vec![
            MessageOutcome::Succeeded { order_id: 1 },
            MessageOutcome::Failed {
                body: "x".to_string(),
                error: "bad".to_string(),
                retryable: false,
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.outcomes.len(), 2);
    }
}
