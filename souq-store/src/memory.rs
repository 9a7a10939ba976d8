//! In-memory store with the same transactional contract as the Postgres
//! implementation: snapshot versions at read, validate them under one lock at
//! commit. Used by tests and local development.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use souq_catalog::{FlashSaleCampaign, Product};
use souq_order::models::Order;
use souq_order::repository::{
    CatalogStore, OrderDirectory, PlacementStore, PlacementTx, StoreError,
};
use souq_shared::Recipient;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    products: HashMap<Uuid, Product>,
    campaigns: Vec<FlashSaleCampaign>,
    orders: Vec<Order>,
    recipients: HashMap<(String, String), Recipient>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

fn lock(inner: &Mutex<Inner>) -> Result<MutexGuard<'_, Inner>, StoreError> {
    inner
        .lock()
        .map_err(|_| StoreError::Backend("store mutex poisoned".to_string()))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&self, product: Product) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.products.insert(product.id, product);
        }
    }

    pub fn insert_campaign(&self, campaign: FlashSaleCampaign) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.campaigns.push(campaign);
        }
    }

    pub fn product_snapshot(&self, id: Uuid) -> Option<Product> {
        self.inner.lock().ok()?.products.get(&id).cloned()
    }

    pub fn campaign_snapshot(&self, id: Uuid) -> Option<FlashSaleCampaign> {
        self.inner
            .lock()
            .ok()?
            .campaigns
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn recipient_snapshot(&self, email: &str, mobile: &str) -> Option<Recipient> {
        self.inner
            .lock()
            .ok()?
            .recipients
            .get(&(email.to_string(), mobile.to_string()))
            .cloned()
    }

    pub fn order_count(&self) -> usize {
        self.inner.lock().map(|i| i.orders.len()).unwrap_or(0)
    }
}

struct MemoryTx {
    inner: Arc<Mutex<Inner>>,
    /// Version each product carried when this transaction first read it.
    read_versions: HashMap<Uuid, i64>,
    staged_products: HashMap<Uuid, Product>,
    staged_sold: Vec<(Uuid, Uuid, i32)>,
    staged_recipient: Option<Recipient>,
    staged_orders: Vec<Order>,
}

#[async_trait]
impl PlacementTx for MemoryTx {
    async fn product(&mut self, id: Uuid) -> Result<Option<Product>, StoreError> {
        if let Some(staged) = self.staged_products.get(&id) {
            return Ok(Some(staged.clone()));
        }
        let inner = lock(&self.inner)?;
        let product = inner.products.get(&id).cloned();
        if let Some(ref p) = product {
            self.read_versions.entry(p.id).or_insert(p.version);
        }
        Ok(product)
    }

    async fn store_product(&mut self, product: &Product) -> Result<(), StoreError> {
        self.read_versions
            .entry(product.id)
            .or_insert(product.version);
        self.staged_products.insert(product.id, product.clone());
        Ok(())
    }

    async fn add_sold_count(
        &mut self,
        campaign_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), StoreError> {
        self.staged_sold.push((campaign_id, product_id, quantity));
        Ok(())
    }

    async fn upsert_recipient(&mut self, recipient: &Recipient) -> Result<(), StoreError> {
        self.staged_recipient = Some(recipient.clone());
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let inner = lock(&self.inner)?;
        let taken = inner
            .orders
            .iter()
            .chain(self.staged_orders.iter())
            .any(|o| o.order_number == order.order_number);
        if taken {
            return Err(StoreError::DuplicateOrderNumber(order.order_number.clone()));
        }
        drop(inner);
        self.staged_orders.push(order.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner)?;

        // Validate everything before applying anything.
        for id in self.staged_products.keys() {
            let current = inner.products.get(id).ok_or_else(|| {
                StoreError::Conflict(format!("product {id} no longer exists"))
            })?;
            let read_version = self.read_versions.get(id).copied().unwrap_or(current.version);
            if current.version != read_version {
                return Err(StoreError::Conflict(format!(
                    "product {id} was modified concurrently"
                )));
            }
        }
        for (campaign_id, product_id, quantity) in &self.staged_sold {
            let item = inner
                .campaigns
                .iter()
                .find(|c| c.id == *campaign_id)
                .and_then(|c| c.item_for(*product_id))
                .ok_or_else(|| {
                    StoreError::Conflict(format!(
                        "flash sale item {campaign_id}/{product_id} no longer exists"
                    ))
                })?;
            if let Some(limit) = item.stock_limit {
                if item.sold_count + quantity > limit {
                    return Err(StoreError::Conflict(format!(
                        "flash sale stock limit exceeded for product {product_id}"
                    )));
                }
            }
        }
        for order in &self.staged_orders {
            if inner.orders.iter().any(|o| o.order_number == order.order_number) {
                return Err(StoreError::Conflict(format!(
                    "order number {} taken concurrently",
                    order.order_number
                )));
            }
        }

        // Apply.
        for (id, mut staged) in self.staged_products {
            staged.version += 1;
            inner.products.insert(id, staged);
        }
        for (campaign_id, product_id, quantity) in self.staged_sold {
            if let Some(item) = inner
                .campaigns
                .iter_mut()
                .find(|c| c.id == campaign_id)
                .and_then(|c| c.items.iter_mut().find(|i| i.product_id == product_id))
            {
                item.sold_count += quantity;
            }
        }
        if let Some(recipient) = self.staged_recipient {
            inner.recipients.insert(
                (recipient.email.clone(), recipient.mobile.clone()),
                recipient,
            );
        }
        inner.orders.extend(self.staged_orders);
        Ok(())
    }
}

#[async_trait]
impl PlacementStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn PlacementTx>, StoreError> {
        Ok(Box::new(MemoryTx {
            inner: Arc::clone(&self.inner),
            read_versions: HashMap::new(),
            staged_products: HashMap::new(),
            staged_sold: Vec::new(),
            staged_recipient: None,
            staged_orders: Vec::new(),
        }))
    }

    async fn active_campaigns(
        &self,
        product_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Vec<FlashSaleCampaign>, StoreError> {
        let inner = lock(&self.inner)?;
        Ok(inner
            .campaigns
            .iter()
            .filter(|c| c.start_date <= now && c.end_date >= now)
            .filter(|c| c.items.iter().any(|i| product_ids.contains(&i.product_id)))
            .cloned()
            .collect())
    }

    async fn campaigns_by_ids(&self, ids: &[Uuid]) -> Result<Vec<FlashSaleCampaign>, StoreError> {
        let inner = lock(&self.inner)?;
        Ok(inner
            .campaigns
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let inner = lock(&self.inner)?;
        Ok(inner.products.get(&id).cloned())
    }

    async fn create_campaign(&self, campaign: &FlashSaleCampaign) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner)?;
        inner.campaigns.push(campaign.clone());
        Ok(())
    }

    async fn campaign(&self, id: Uuid) -> Result<Option<FlashSaleCampaign>, StoreError> {
        let inner = lock(&self.inner)?;
        Ok(inner.campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn update_campaign(&self, campaign: &FlashSaleCampaign) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner)?;
        let slot = inner
            .campaigns
            .iter_mut()
            .find(|c| c.id == campaign.id)
            .ok_or_else(|| {
                StoreError::Conflict(format!("flash sale {} no longer exists", campaign.id))
            })?;
        *slot = campaign.clone();
        Ok(())
    }

    async fn campaigns(&self) -> Result<Vec<FlashSaleCampaign>, StoreError> {
        let inner = lock(&self.inner)?;
        Ok(inner.campaigns.clone())
    }
}

#[async_trait]
impl OrderDirectory for MemoryStore {
    async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        let inner = lock(&self.inner)?;
        Ok(inner
            .orders
            .iter()
            .find(|o| o.order_number == order_number)
            .cloned())
    }
}
