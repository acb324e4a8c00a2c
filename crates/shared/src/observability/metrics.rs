//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "order_events_published_total",
        "OrderCreated publish attempts by outcome"
    );
    metrics::describe_counter!(
        "notification_messages_total",
        "Queued messages processed by the notification worker, by outcome"
    );
    metrics::describe_histogram!(
        "notification_batch_size",
        "Number of messages per handled batch"
    );
    metrics::describe_counter!(
        "status_callbacks_total",
        "Status update callbacks to the order service, by outcome"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次事件发布尝试，outcome 为 "published" 或失败类型
#[inline]
pub fn record_event_publish(outcome: &str) {
    metrics::counter!(
        "order_events_published_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录一个批次的处理结果
#[inline]
pub fn record_notification_batch(succeeded: usize, failed: usize) {
    metrics::histogram!("notification_batch_size").record((succeeded + failed) as f64);
    metrics::counter!("notification_messages_total", "outcome" => "succeeded")
        .increment(succeeded as u64);
    metrics::counter!("notification_messages_total", "outcome" => "failed")
        .increment(failed as u64);
}

/// 记录状态回调
#[inline]
pub fn record_status_callback(outcome: &str) {
    metrics::counter!(
        "status_callbacks_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
