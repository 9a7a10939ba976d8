use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::{error, info};

use souq_order::events::{FlashSaleSnapshot, OrderEventPublisher};
use souq_order::models::Order;

pub const ORDER_CREATED_TOPIC: &str = "orders.created";
pub const FLASH_SALE_UPDATED_TOPIC: &str = "flash-sales.updated";

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(0)))
            .await
        {
            Ok(delivery) => {
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic, key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

/// Post-commit broadcast; delivery failures are logged and swallowed so a
/// committed order is never failed by its notifications.
#[async_trait]
impl OrderEventPublisher for EventProducer {
    async fn order_created(&self, order: &Order) {
        let payload = match serde_json::to_string(order) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize order event: {}", e);
                return;
            }
        };
        let _ = self
            .publish(ORDER_CREATED_TOPIC, &order.order_number, &payload)
            .await;
    }

    async fn flash_sale_updated(&self, sales: &[FlashSaleSnapshot]) {
        for sale in sales {
            let payload = match serde_json::to_string(sale) {
                Ok(payload) => payload,
                Err(e) => {
                    error!("Failed to serialize flash sale snapshot: {}", e);
                    continue;
                }
            };
            let key = sale.campaign_id.to_string();
            let _ = self
                .publish(FLASH_SALE_UPDATED_TOPIC, &key, &payload)
                .await;
        }
    }
}
