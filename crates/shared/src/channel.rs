//! 消息通道抽象
//!
//! 生产者只依赖 `EventChannel`，生产环境由 Kafka 实现，
//! 开发和测试环境使用内存通道，可模拟通道故障。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::PublishFailure;

/// 消息通道
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// 单次尽力投递，不做重试
    async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PublishFailure>;
}

/// 已投递到内存通道的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub topic: String,
    pub key: String,
    pub body: String,
}

/// 内存通道
///
/// 克隆后共享同一个队列。`set_available(false)` 之后所有投递都返回通道错误。
#[derive(Debug, Clone)]
pub struct InMemoryChannel {
    messages: Arc<Mutex<Vec<QueuedMessage>>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// 一个始终不可用的通道
    pub fn unavailable() -> Self {
        let channel = Self::new();
        channel.set_available(false);
        channel
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 当前队列中的所有消息
    pub fn messages(&self) -> Vec<QueuedMessage> {
        self.messages.lock().clone()
    }

    /// 取出并清空队列，模拟消费端拉取一批
    pub fn drain(&self) -> Vec<QueuedMessage> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

#[async_trait]
impl EventChannel for InMemoryChannel {
    async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PublishFailure> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(PublishFailure::Channel(format!("topic {topic} 不可达")));
        }

        let body = String::from_utf8(payload.to_vec())
            .map_err(|e| PublishFailure::Serialization(format!("负载非 UTF-8 编码: {e}")))?;

        self.messages.lock().push(QueuedMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            body,
        });
        Ok(())
    }
}
