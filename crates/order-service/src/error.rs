//! HTTP 错误映射
//!
//! 将共享的 `OrderError` 映射为 HTTP 状态码与统一的 JSON 错误体。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use order_shared::error::OrderError;
use serde_json::json;

/// 接口层错误
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub OrderError);

impl ApiError {
    /// 参数错误与资源不存在分别对应 400 与 404
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            OrderError::Validation(_) => StatusCode::BAD_REQUEST,
            OrderError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, "请求处理失败");
            "服务内部错误，请稍后重试".to_string()
        } else {
            self.0.to_string()
        };

        let body = json!({
            "code": self.0.code(),
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
