//! 路由配置模块

use axum::{
    Router, middleware,
    routing::{get, patch},
};
use order_shared::observability::middleware::http_tracing;

use crate::{handlers, state::AppState};

/// 订单路由
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route("/orders/{id}", get(handlers::get_order))
        .route("/orders/{id}/status", patch(handlers::update_order_status))
}

/// 完整应用：订单路由、健康检查与请求追踪中间件
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(order_routes())
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn(http_tracing))
        .with_state(state)
}
