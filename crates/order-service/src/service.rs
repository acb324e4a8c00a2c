//! 订单写路径
//!
//! 创建订单分两步：先持久化，再发布事件。两步的结果分别返回，
//! 持久化失败才是创建失败，发布失败只体现在 `PublishOutcome` 中。

use std::sync::Arc;

use order_shared::error::{OrderError, Result};
use tracing::{info, warn};

use crate::models::{NewOrder, Order};
use crate::publisher::{OrderEventPublisher, PublishOutcome};
use crate::repository::OrderRepository;

/// 创建订单的组合结果
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order: Order,
    pub publish: PublishOutcome,
}

/// 订单服务
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    publisher: OrderEventPublisher,
}

impl OrderService {
    pub fn new(repository: Arc<dyn OrderRepository>, publisher: OrderEventPublisher) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// 持久化订单后发布 OrderCreated 事件
    ///
    /// 无论发布结果如何都返回已持久化的订单，已提交的写入不会被回滚。
    pub async fn create(&self, new_order: NewOrder) -> Result<CreatedOrder> {
        let order = self.repository.create(new_order).await?;

        info!(
            order_id = order.id,
            customer_name = %order.customer_name,
            status = %order.status,
            "订单已创建"
        );

        let publish = self.publisher.publish_order_created(&order).await;

        Ok(CreatedOrder { order, publish })
    }

    /// 更新订单状态
    ///
    /// 缺失或空白的状态是参数错误，先于订单查找报告，与订单不存在区分开。
    /// 重复设置同一状态是幂等的。
    pub async fn update_status(&self, id: i64, status: Option<&str>) -> Result<Order> {
        let new_status = status
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| OrderError::Validation("status 不能为空".to_string()))?;

        let Some(mut order) = self.repository.find_by_id(id).await? else {
            warn!(order_id = id, "订单不存在，无法更新状态");
            return Err(OrderError::order_not_found(id));
        };

        let old_status = std::mem::replace(&mut order.status, new_status.to_string());
        let updated = self.repository.save(&order).await?;

        info!(
            order_id = id,
            old_status = %old_status,
            new_status = %updated.status,
            "订单状态已更新"
        );

        Ok(updated)
    }

    pub async fn get(&self, id: i64) -> Result<Order> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| OrderError::order_not_found(id))
    }

    pub async fn list(&self) -> Result<Vec<Order>> {
        self.repository.find_all().await
    }
}
