//! 订单状态回调客户端
//!
//! 调用订单服务的 `PATCH /orders/{id}/status`。客户端带固定超时，
//! 远端挂起时以 `Transport` 错误返回，而不是阻塞整个批次。

use std::time::Duration;

use async_trait::async_trait;
use order_shared::config::NotificationConfig;
use order_shared::observability::metrics;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::NotificationError;

/// 回调成功时的远端响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Serialize)]
struct StatusUpdateRequest<'a> {
    status: &'a str,
}

/// 订单状态更新接口
///
/// 实现应为无状态句柄，可在多条消息之间共享。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusUpdater: Send + Sync {
    async fn update_status(
        &self,
        order_id: i64,
        status: &str,
    ) -> Result<StatusResponse, NotificationError>;
}

/// 基于 reqwest 的订单服务客户端
#[derive(Debug, Clone)]
pub struct OrderStatusClient {
    http: reqwest::Client,
    base_url: String,
}

impl OrderStatusClient {
    /// 默认超时 10 秒
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, NotificationError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Transport(format!("创建 HTTP 客户端失败: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(base_url = %base_url, timeout_ms = timeout.as_millis() as u64, "订单状态客户端已初始化");

        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotificationError> {
        Self::new(config.order_service_url.clone(), config.request_timeout())
    }

    fn status_url(&self, order_id: i64) -> String {
        format!("{}/orders/{}/status", self.base_url, order_id)
    }

    async fn send_update(
        &self,
        order_id: i64,
        status: &str,
    ) -> Result<StatusResponse, NotificationError> {
        let url = self.status_url(order_id);
        debug!(url = %url, status, "调用订单服务");

        let response = self
            .http
            .patch(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&StatusUpdateRequest { status })
            .send()
            .await?;

        let code = response.status();
        let body = response.text().await?;

        if code.is_success() {
            info!(order_id, status, response_status = code.as_u16(), "订单状态已更新");
            Ok(StatusResponse {
                status: code.as_u16(),
                body,
            })
        } else {
            warn!(order_id, response_status = code.as_u16(), body = %body, "订单服务拒绝状态更新");
            Err(NotificationError::RemoteRejection {
                status: code.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl StatusUpdater for OrderStatusClient {
    async fn update_status(
        &self,
        order_id: i64,
        status: &str,
    ) -> Result<StatusResponse, NotificationError> {
        let result = self.send_update(order_id, status).await;
        metrics::record_status_callback(match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use super::*;
    use axum::{
        Json, Router,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::patch,
    };
    use parking_lot::Mutex;

    #[derive(Debug, Clone)]
    struct RecordedCall {
        order_id: i64,
        content_type: Option<String>,
        body: serde_json::Value,
    }

    type Calls = Arc<Mutex<Vec<RecordedCall>>>;

    /// 启动一个本地订单服务替身，返回监听地址
    async fn spawn_target(reply: StatusCode, delay: Duration) -> (SocketAddr, Calls) {
        let calls: Calls = Arc::default();

        let app = Router::new()
            .route(
                "/orders/{id}/status",
                patch(
                    move |State(calls): State<Calls>,
                          Path(order_id): Path<i64>,
                          headers: HeaderMap,
                          Json(body): Json<serde_json::Value>| async move {
                        calls.lock().push(RecordedCall {
                            order_id,
                            content_type: headers
                                .get(CONTENT_TYPE)
                                .and_then(|v| v.to_str().ok())
                                .map(String::from),
                            body,
                        });
                        tokio::time::sleep(delay).await;
                        (reply, format!("reply for {order_id}"))
                    },
                ),
            )
            .with_state(calls.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (addr, calls)
    }

    #[tokio::test]
    async fn test_update_status_success() {
        let (addr, calls) = spawn_target(StatusCode::OK, Duration::ZERO).await;
        let client =
            OrderStatusClient::new(format!("http://{addr}/"), OrderStatusClient::DEFAULT_TIMEOUT)
                .unwrap();

        let response = client.update_status(7, "NOTIFIED").await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "reply for 7");

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].order_id, 7);
        assert_eq!(calls[0].content_type.as_deref(), Some("application/json"));
        assert_eq!(calls[0].body, serde_json::json!({"status": "NOTIFIED"}));
    }

    #[tokio::test]
    async fn test_non_2xx_is_remote_rejection() {
        let (addr, _calls) = spawn_target(StatusCode::INTERNAL_SERVER_ERROR, Duration::ZERO).await;
        let client =
            OrderStatusClient::new(format!("http://{addr}"), OrderStatusClient::DEFAULT_TIMEOUT)
                .unwrap();

        let err = client.update_status(3, "NOTIFIED").await.unwrap_err();
        match err {
            NotificationError::RemoteRejection { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "reply for 3");
            }
            other => panic!("期望 RemoteRejection，实际 {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_remote_times_out() {
        let (addr, _calls) = spawn_target(StatusCode::OK, Duration::from_secs(5)).await;
        let client =
            OrderStatusClient::new(format!("http://{addr}"), Duration::from_millis(200)).unwrap();

        let started = std::time::Instant::now();
        let err = client.update_status(1, "NOTIFIED").await.unwrap_err();

        assert!(matches!(err, NotificationError::Transport(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_transport_error() {
        // 绑定后立即释放端口，保证没有监听者
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            OrderStatusClient::new(format!("http://{addr}"), Duration::from_secs(1)).unwrap();
        let err = client.update_status(1, "NOTIFIED").await.unwrap_err();

        assert!(matches!(err, NotificationError::Transport(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_status_url_trims_trailing_slash() {
        let client =
            OrderStatusClient::new("http://orders:8081/", OrderStatusClient::DEFAULT_TIMEOUT)
                .unwrap();
        assert_eq!(client.status_url(42), "http://orders:8081/orders/42/status");
    }
}
