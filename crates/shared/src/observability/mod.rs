//! 统一可观测性模块
//!
//! 提供日志与 metrics 的统一初始化。
//! 所有服务通过单一入口点配置可观测性，确保一致的指标命名和日志格式。

pub mod metrics;
pub mod middleware;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::AppConfig;

/// 可观测性初始化参数
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 服务名称，用于标识日志和指标的来源
    pub service_name: String,
    /// 日志级别（如 "info", "debug"），RUST_LOG 优先
    pub log_level: String,
    /// 是否启用 JSON 格式日志
    pub json_logs: bool,
    /// 为 None 时不启动 Prometheus 导出
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown-service".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_port: None,
        }
    }
}

impl From<&AppConfig> for ObservabilityConfig {
    fn from(config: &AppConfig) -> Self {
        let obs = &config.observability;
        Self {
            service_name: config.service_name.clone(),
            log_level: obs.log_level.clone(),
            json_logs: obs.log_format.eq_ignore_ascii_case("json"),
            metrics_port: obs.metrics_enabled.then_some(obs.metrics_port),
        }
    }
}

/// 可观测性资源守卫
///
/// 持有指标导出服务的生命周期，drop 时记录关闭日志。
pub struct ObservabilityGuard {
    _metrics_handle: Option<metrics::MetricsHandle>,
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!("Shutting down observability...");
    }
}

/// 统一初始化可观测性
///
/// 先初始化日志，再按配置启动 Prometheus 指标导出。
///
/// ```ignore
/// let config = AppConfig::load("notification-worker")?;
/// let _guard = order_shared::observability::init(&(&config).into()).await?;
/// ```
pub async fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    info!(
        service = %config.service_name,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    let metrics_handle = match config.metrics_port {
        Some(port) => Some(metrics::init(&config.service_name, port).await?),
        None => None,
    };

    Ok(ObservabilityGuard {
        _metrics_handle: metrics_handle,
    })
}
