//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。
//! 配置只在进程启动时加载一次，之后以引用形式注入各组件，业务代码不直接读取环境变量。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 订单服务基础地址的环境变量名
pub const ORDER_SERVICE_URL_ENV: &str = "ORDER_SERVICE_URL";
/// 订单事件队列（Kafka topic）名称的环境变量名
pub const ORDER_EVENTS_QUEUE_ENV: &str = "ORDER_EVENTS_QUEUE";

/// Kafka 配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub brokers: String,
    pub consumer_group: String,
    pub auto_offset_reset: String,
    /// 订单创建事件所在的 topic，即生产者与消费者之间的队列
    pub order_events_topic: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            consumer_group: "order-notification".to_string(),
            auto_offset_reset: "earliest".to_string(),
            order_events_topic: "orders.created".to_string(),
        }
    }
}

/// 服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

/// 通知工作者配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// 状态回调的目标服务地址，不带末尾斜杠
    pub order_service_url: String,
    /// 回调请求的连接/整体超时
    pub request_timeout_secs: u64,
    /// 模拟通知发送的耗时
    pub simulated_delay_ms: u64,
    /// 单批最多处理的消息数
    pub batch_size: usize,
    /// 凑批等待窗口，窗口结束时即使不满一批也立即处理
    pub batch_window_ms: u64,
    /// 批内并发处理的消息数，1 表示按顺序逐条处理
    pub concurrency: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            order_service_url: "http://localhost:8081".to_string(),
            request_timeout_secs: 10,
            simulated_delay_ms: 100,
            batch_size: 10,
            batch_window_ms: 1000,
            concurrency: 4,
        }
    }
}

impl NotificationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }

    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch_window_ms)
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub kafka: KafkaConfig,
    pub notification: NotificationConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（ORDERS_ 前缀，如 ORDERS_KAFKA__BROKERS -> kafka.brokers）
    /// 5. ORDER_SERVICE_URL / ORDER_EVENTS_QUEUE 两个约定变量
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("ORDERS_ENV").unwrap_or_else(|_| "development".to_string());

        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("ORDERS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.apply_overrides(
            std::env::var(ORDER_SERVICE_URL_ENV).ok(),
            std::env::var(ORDER_EVENTS_QUEUE_ENV).ok(),
        );

        Ok(config)
    }

    /// 应用约定环境变量的覆盖值，空字符串视为未设置
    fn apply_overrides(&mut self, order_service_url: Option<String>, queue: Option<String>) {
        if let Some(url) = order_service_url.filter(|v| !v.trim().is_empty()) {
            self.notification.order_service_url = url.trim_end_matches('/').to_string();
        }
        if let Some(topic) = queue.filter(|v| !v.trim().is_empty()) {
            self.kafka.order_events_topic = topic;
        }
    }

    /// 获取服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
