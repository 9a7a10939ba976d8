use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use souq_catalog::{FlashSaleCampaign, FlashSaleItem};
use uuid::Uuid;

use crate::models::Order;

/// Compact per-product view of a campaign's counters after an order moved
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashItemSnapshot {
    pub product_id: Uuid,
    pub flash_price_minor: i64,
    pub stock_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub sold_count: i32,
    pub remaining: Option<i32>,
}

impl From<&FlashSaleItem> for FlashItemSnapshot {
    fn from(item: &FlashSaleItem) -> Self {
        Self {
            product_id: item.product_id,
            flash_price_minor: item.flash_price_minor,
            stock_limit: item.stock_limit,
            per_user_limit: item.per_user_limit,
            sold_count: item.sold_count,
            remaining: item.remaining(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashSaleSnapshot {
    pub campaign_id: Uuid,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub items: Vec<FlashItemSnapshot>,
}

impl From<&FlashSaleCampaign> for FlashSaleSnapshot {
    fn from(campaign: &FlashSaleCampaign) -> Self {
        Self {
            campaign_id: campaign.id,
            title: campaign.title.clone(),
            start_date: campaign.start_date,
            end_date: campaign.end_date,
            items: campaign.items.iter().map(FlashItemSnapshot::from).collect(),
        }
    }
}

/// Downstream broadcast of committed placement effects.
///
/// Invoked only after a successful commit; implementations are
/// fire-and-forget and must swallow (log) their own delivery failures rather
/// than fail the placement.
#[async_trait]
pub trait OrderEventPublisher: Send + Sync {
    async fn order_created(&self, order: &Order);

    async fn flash_sale_updated(&self, sales: &[FlashSaleSnapshot]);
}
