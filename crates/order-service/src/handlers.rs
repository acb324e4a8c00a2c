//! 订单接口处理器

use axum::{
    Json,
    extract::{Path, State},
};

use crate::error::Result;
use crate::models::{NewOrder, Order, UpdateStatusRequest};
use crate::state::AppState;

/// GET /orders
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders.list().await?))
}

/// POST /orders
///
/// 响应只包含订单本身，事件发布结果不对调用方暴露。
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<NewOrder>,
) -> Result<Json<Order>> {
    let created = state.orders.create(req).await?;
    Ok(Json(created.order))
}

/// GET /orders/{id}
pub async fn get_order(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Order>> {
    Ok(Json(state.orders.get(id).await?))
}

/// PATCH /orders/{id}/status
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    let order = state
        .orders
        .update_status(id, req.status.as_deref())
        .await?;
    Ok(Json(order))
}

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}
