//! 订单仓储
//!
//! 订单的关系型存储属于外部协作方，这里只定义接口，
//! 并提供一个基于 DashMap 的内存实现用于开发和测试。

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use order_shared::error::Result;

use crate::models::{NewOrder, Order};

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 首次持久化：分配 id 与创建时间，缺省状态为 CREATED
    async fn create(&self, new_order: NewOrder) -> Result<Order>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>>;
    async fn find_all(&self) -> Result<Vec<Order>>;
    /// 覆盖保存已存在的订单
    async fn save(&self, order: &Order) -> Result<Order>;
}

/// 内存订单仓储
///
/// 克隆后共享同一份数据，id 从 1 开始自增。
#[derive(Debug, Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<DashMap<i64, Order>>,
    next_id: Arc<AtomicI64>,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    pub fn count(&self) -> usize {
        self.orders.len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, new_order: NewOrder) -> Result<Order> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let order = Order {
            id,
            status: new_order.initial_status(),
            customer_name: new_order.customer_name,
            created_at: Utc::now(),
            total: new_order.total,
        };
        self.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_all(&self) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|order| order.id);
        Ok(orders)
    }

    async fn save(&self, order: &Order) -> Result<Order> {
        self.orders.insert(order.id, order.clone());
        Ok(order.clone())
    }
}
