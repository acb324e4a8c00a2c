//! 订单服务
//!
//! 提供订单 REST API，创建订单后向 Kafka 发布 OrderCreated 事件。

use std::sync::Arc;

use order_service::{
    publisher::OrderEventPublisher, repository::InMemoryOrderRepository, routes,
    service::OrderService, state::AppState,
};
use order_shared::{config::AppConfig, kafka::KafkaProducer, observability};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("order-service")?;
    let _guard = observability::init(&(&config).into()).await?;

    info!(
        addr = %config.server_addr(),
        topic = %config.kafka.order_events_topic,
        "Starting order-service"
    );

    let producer = KafkaProducer::new(&config.kafka)?;
    let publisher = OrderEventPublisher::new(Arc::new(producer), &config.kafka.order_events_topic);

    // 关系型存储是外部协作方，本进程使用内存实现
    let repository = Arc::new(InMemoryOrderRepository::new());
    let service = Arc::new(OrderService::new(repository, publisher));

    let app = routes::app(AppState::new(service));
    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("order-service listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("收到关闭信号，order-service 退出");
        })
        .await?;

    Ok(())
}
