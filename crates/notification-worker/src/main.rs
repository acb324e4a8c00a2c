//! 通知工作者
//!
//! 消费订单创建事件，发送通知并回调订单服务更新状态。

use std::sync::Arc;

use notification_worker::{
    consumer::{BatchNotificationConsumer, NotificationWorker},
    notifier::SimulatedNotifier,
    processor::MessageProcessor,
    status_client::OrderStatusClient,
};
use order_shared::{config::AppConfig, observability};
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("notification-worker")?;
    let _guard = observability::init(&(&config).into()).await?;

    let notification = &config.notification;
    info!(
        order_service_url = %notification.order_service_url,
        topic = %config.kafka.order_events_topic,
        batch_size = notification.batch_size,
        "Starting notification-worker"
    );

    let status_client = Arc::new(OrderStatusClient::from_config(notification)?);
    let notifier = Arc::new(SimulatedNotifier::new(notification.simulated_delay()));
    let processor = Arc::new(MessageProcessor::new(notifier, status_client));
    let batch_consumer =
        BatchNotificationConsumer::new(processor).with_concurrency(notification.concurrency);

    let worker = NotificationWorker::new(&config.kafka, notification, batch_consumer)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("收到关闭信号，notification-worker 准备退出");
        let _ = shutdown_tx.send(true);
    });

    worker.run(shutdown_rx).await?;

    Ok(())
}
