//! 通知工作者错误类型
//!
//! 区分网络/超时、远端拒绝与消息解析三类失败，
//! 便于日志中判断一条消息是否有可能在重新投递后成功。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    /// 连接失败、超时等网络层错误
    #[error("调用订单服务失败: {0}")]
    Transport(String),

    /// 订单服务返回了 2xx 以外的状态码
    #[error("订单服务拒绝状态更新: status={status}, body={body}")]
    RemoteRejection { status: u16, body: String },

    /// 消息体不是合法 JSON，或缺少数值型 orderId
    #[error("消息解析失败: {0}")]
    Parse(String),

    #[error(transparent)]
    Shared(#[from] order_shared::error::OrderError),
}

impl NotificationError {
    /// 原则上可重试的错误；本服务不做重试，只用于日志分类
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::RemoteRejection { status, .. } => *status >= 500,
            Self::Parse(_) => false,
            Self::Shared(e) => e.is_retryable(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::RemoteRejection { .. } => "rejected",
            Self::Parse(_) => "parse",
            Self::Shared(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("请求超时: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}
