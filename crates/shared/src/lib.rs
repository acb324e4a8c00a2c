//! 共享库
//!
//! 包含订单服务与通知工作者共用的配置、错误处理、事件模型、消息通道与可观测性基础设施。

pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod kafka;
pub mod observability;
