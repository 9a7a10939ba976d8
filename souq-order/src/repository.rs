use async_trait::async_trait;
use chrono::{DateTime, Utc};
use souq_catalog::{FlashSaleCampaign, Product};
use souq_shared::Recipient;
use uuid::Uuid;

use crate::models::Order;

/// Storage-layer failures surfaced to the committer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A document the transaction read was modified concurrently, or a
    /// guarded write (stock decrement, sold-count increment) no longer holds.
    #[error("concurrent modification: {0}")]
    Conflict(String),

    /// Unique order-number constraint violated on insert.
    #[error("duplicate order number: {0}")]
    DuplicateOrderNumber(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// One atomic placement transaction.
///
/// All reads see the transaction's own writes. Dropping the value without
/// calling [`PlacementTx::commit`] aborts it and releases every held
/// resource; no partial mutation survives an abort.
#[async_trait]
pub trait PlacementTx: Send {
    async fn product(&mut self, id: Uuid) -> Result<Option<Product>, StoreError>;

    /// Persist a product's stock fields (root stock and flat sizes), guarded
    /// by the version the product was read at. A version mismatch is a
    /// [`StoreError::Conflict`].
    async fn store_product(&mut self, product: &Product) -> Result<(), StoreError>;

    /// Increment `sold_count` for one campaign+product pair. The store
    /// re-checks `sold_count + quantity <= stock_limit` so concurrent orders
    /// can never push a counter past its limit; a failed check is a
    /// [`StoreError::Conflict`].
    async fn add_sold_count(
        &mut self,
        campaign_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), StoreError>;

    /// Upsert the recipient directory entry keyed by (email, mobile).
    async fn upsert_recipient(&mut self, recipient: &Recipient) -> Result<(), StoreError>;

    /// Insert the order; an order-number collision is reported as
    /// [`StoreError::DuplicateOrderNumber`] so the caller can retry once.
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Entry point for placement transactions plus the campaign reads the
/// placement path needs outside a transaction.
#[async_trait]
pub trait PlacementStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn PlacementTx>, StoreError>;

    /// Campaigns whose window covers `now` and which include at least one of
    /// the given products.
    async fn active_campaigns(
        &self,
        product_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Vec<FlashSaleCampaign>, StoreError>;

    /// Fresh campaign state, used to build post-commit event snapshots.
    async fn campaigns_by_ids(&self, ids: &[Uuid]) -> Result<Vec<FlashSaleCampaign>, StoreError>;
}

/// Catalog reads and campaign configuration, used by the HTTP surface.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    async fn create_campaign(&self, campaign: &FlashSaleCampaign) -> Result<(), StoreError>;

    async fn campaign(&self, id: Uuid) -> Result<Option<FlashSaleCampaign>, StoreError>;

    /// Replace a campaign's fields and items wholesale. The caller passes the
    /// full desired state, including `sold_count` values to keep.
    async fn update_campaign(&self, campaign: &FlashSaleCampaign) -> Result<(), StoreError>;

    async fn campaigns(&self) -> Result<Vec<FlashSaleCampaign>, StoreError>;
}

/// Read access to committed orders.
#[async_trait]
pub trait OrderDirectory: Send + Sync {
    async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError>;
}
