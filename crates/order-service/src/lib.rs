//! 订单服务
//!
//! 订单写路径：持久化订单后尽力发布 OrderCreated 事件。
//! 事件发布失败只记录日志与指标，不影响订单创建结果。

pub mod error;
pub mod handlers;
pub mod models;
pub mod publisher;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
