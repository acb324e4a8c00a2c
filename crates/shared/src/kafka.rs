//! Kafka 基础设施封装
//!
//! 将 rdkafka 的底层 API 封装为业务友好的 Producer/Consumer 抽象，
//! 统一消息序列化、错误映射和优雅关闭语义，避免各服务重复编写样板代码。

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::producer::{FutureProducer, FutureRecord};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::channel::EventChannel;
use crate::config::KafkaConfig;
use crate::error::{OrderError, PublishFailure};

/// 单次投递的最长等待时间，超时即视为通道不可用
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// ConsumerMessage
// ---------------------------------------------------------------------------

/// 消费到的 Kafka 消息的统一表示
///
/// 将 rdkafka 的 `BorrowedMessage`（带生命周期约束）转换为拥有所有权的结构体，
/// 使消息可以安全地跨 await 点传递给异步处理函数。
#[derive(Debug, Clone)]
pub struct ConsumerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

impl ConsumerMessage {
    fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            payload: msg.payload().map(|p| p.to_vec()).unwrap_or_default(),
        }
    }

    /// 消息体文本，非法 UTF-8 字节以替换字符呈现，便于原样写入日志
    pub fn body_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

// ---------------------------------------------------------------------------
// KafkaProducer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 生产者
///
/// `FutureProducer` 内部是 Arc 包装的，克隆开销很小。
#[derive(Clone)]
pub struct KafkaProducer {
    producer: FutureProducer,
}

impl KafkaProducer {
    /// 根据配置创建生产者
    ///
    /// `message.timeout.ms` 与 [`DELIVERY_TIMEOUT`] 一致，保证一次发布尝试有明确上限。
    pub fn new(config: &KafkaConfig) -> Result<Self, OrderError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set(
                "message.timeout.ms",
                DELIVERY_TIMEOUT.as_millis().to_string(),
            )
            .create()
            .map_err(|e| OrderError::Kafka(format!("创建生产者失败: {e}")))?;

        info!(brokers = %config.brokers, "Kafka 生产者已初始化");
        Ok(Self { producer })
    }
}

#[async_trait]
impl EventChannel for KafkaProducer {
    async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PublishFailure> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        let delivery = self
            .producer
            .send(record, DELIVERY_TIMEOUT)
            .await
            .map_err(|(e, _)| PublishFailure::Channel(format!("发送消息失败: {e}")))?;

        debug!(
            topic,
            key,
            partition = delivery.partition,
            offset = delivery.offset,
            "消息已发送"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KafkaConsumer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 消费者
///
/// 封装 `StreamConsumer`，按批次把消息交给处理函数，并提供基于 `watch` channel 的优雅关闭。
pub struct KafkaConsumer {
    consumer: StreamConsumer,
}

impl KafkaConsumer {
    /// 创建消费者
    ///
    /// offset 不在拉取时自动存储，而是在一批消息交给处理函数并返回后才存储，
    /// 再由自动提交写回 broker。处理完成前进程退出时，该批消息会被重新投递。
    pub fn new(config: &KafkaConfig) -> Result<Self, OrderError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.consumer_group)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .create()
            .map_err(|e| OrderError::Kafka(format!("创建消费者失败: {e}")))?;

        info!(
            brokers = %config.brokers,
            group_id = %config.consumer_group,
            "Kafka 消费者已初始化"
        );
        Ok(Self { consumer })
    }

    /// 订阅指定的 topic 列表
    pub fn subscribe(&self, topics: &[&str]) -> Result<(), OrderError> {
        self.consumer
            .subscribe(topics)
            .map_err(|e| OrderError::Kafka(format!("订阅 topic 失败: {e}")))?;

        info!(?topics, "已订阅 Kafka topics");
        Ok(())
    }

    /// 启动批量消费循环
    ///
    /// 凑批规则见 `next_batch`。handler 返回后才存储本批 offset 并拉取下一批，
    /// 因此同一时刻只有一个批次在处理。关闭信号只在批次之间检查，
    /// 正在处理的批次会自然完成。
    pub async fn start_batched<F, Fut>(
        self,
        mut shutdown: watch::Receiver<bool>,
        batch_size: usize,
        window: Duration,
        handler: F,
    ) where
        F: Fn(Vec<ConsumerMessage>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let stream = self
            .consumer
            .stream()
            .map(|received| received.map(|msg| ConsumerMessage::from_borrowed(&msg)));
        futures::pin_mut!(stream);

        info!(batch_size, window_ms = window.as_millis() as u64, "Kafka 批量消费循环已启动");

        while let Some(batch) = next_batch(&mut stream, &mut shutdown, batch_size, window).await {
            debug!(size = batch.len(), "凑批完成");
            let positions = next_positions(&batch);

            handler(batch).await;

            for ((topic, partition), offset) in positions {
                if let Err(e) = self.consumer.store_offset(&topic, partition, offset) {
                    warn!(topic = %topic, partition, offset, error = %e, "存储 offset 失败");
                }
            }
        }
    }
}

/// 从消息流中取下一批
///
/// 等到第一条消息后开启一个凑批窗口，窗口内最多收集 `batch_size` 条，
/// 满批或窗口结束即返回。接收出错的消息只记录日志，不计入批次。
/// 收到关闭信号或消息流结束时返回 `None`。
async fn next_batch<S, T, E>(
    stream: &mut S,
    shutdown: &mut watch::Receiver<bool>,
    batch_size: usize,
    window: Duration,
) -> Option<Vec<T>>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    E: Display,
{
    let batch_size = batch_size.max(1);

    loop {
        let first = tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("收到关闭信号，Kafka 消费循环退出");
                    return None;
                }
                continue;
            }

            next = stream.next() => next,
        };

        let Some(first) = first else {
            warn!("Kafka 消息流意外结束");
            return None;
        };

        let mut batch = Vec::with_capacity(batch_size);
        push_received(&mut batch, first);

        let deadline = tokio::time::Instant::now() + window;
        while batch.len() < batch_size {
            match tokio::time::timeout_at(deadline, stream.next()).await {
                Ok(Some(received)) => push_received(&mut batch, received),
                Ok(None) | Err(_) => break,
            }
        }

        if !batch.is_empty() {
            return Some(batch);
        }
    }
}

fn push_received<T, E: Display>(batch: &mut Vec<T>, received: Result<T, E>) {
    match received {
        Ok(msg) => batch.push(msg),
        Err(e) => error!(error = %e, "接收 Kafka 消息出错"),
    }
}

/// 每个分区处理完本批后应存储的 offset，即该分区最大 offset 的下一位
fn next_positions(batch: &[ConsumerMessage]) -> BTreeMap<(String, i32), i64> {
    batch.iter().fold(BTreeMap::new(), |mut positions, msg| {
        let next = positions
            .entry((msg.topic.clone(), msg.partition))
            .or_insert(msg.offset + 1);
        *next = (*next).max(msg.offset + 1);
        positions
    })
}
