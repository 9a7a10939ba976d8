use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use souq_shared::{CurrencyTable, CustomerIdentity, Recipient};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::OrderError;
use crate::events::{FlashSaleSnapshot, OrderEventPublisher};
use crate::models::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::pricer::OrderPricer;
use crate::repository::{PlacementStore, StoreError};
use crate::request::{AssertedPaymentStatus, PlacementRequest};

/// Generates candidate order numbers. `retry` is used exactly once after a
/// uniqueness collision; a second collision aborts the placement.
pub trait OrderNumberGenerator: Send + Sync {
    fn next(&self) -> String;
    fn retry(&self) -> String;
}

/// Production generator: `ORD{unix_millis}`, retried with a random 0-999
/// suffix.
pub struct TimestampOrderNumbers;

impl OrderNumberGenerator for TimestampOrderNumbers {
    fn next(&self) -> String {
        format!("ORD{}", Utc::now().timestamp_millis())
    }

    fn retry(&self) -> String {
        let suffix = Uuid::new_v4().as_u128() % 1000;
        format!("ORD{}-{}", Utc::now().timestamp_millis(), suffix)
    }
}

/// What the caller gets back from a successful placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementReceipt {
    pub order_id: Uuid,
    pub order_number: String,
    #[serde(rename = "totalAmount")]
    pub total_minor: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
}

/// Drives the atomic placement protocol: price the request, apply every
/// mutation inside one storage transaction, and publish events only after the
/// commit. A caller observes either a fully applied order or an error with
/// nothing persisted.
pub struct OrderCommitter {
    store: Arc<dyn PlacementStore>,
    publisher: Arc<dyn OrderEventPublisher>,
    currency: CurrencyTable,
    order_numbers: Box<dyn OrderNumberGenerator>,
}

impl OrderCommitter {
    pub fn new(
        store: Arc<dyn PlacementStore>,
        publisher: Arc<dyn OrderEventPublisher>,
        currency: CurrencyTable,
    ) -> Self {
        Self {
            store,
            publisher,
            currency,
            order_numbers: Box::new(TimestampOrderNumbers),
        }
    }

    /// Replace the order-number source (tests exercise the collision path
    /// with a fixed generator).
    pub fn with_order_numbers(mut self, generator: Box<dyn OrderNumberGenerator>) -> Self {
        self.order_numbers = generator;
        self
    }

    /// Place an order. Stock and flash-counter conflicts are not retried
    /// here; the caller resubmits.
    pub async fn place(
        &self,
        request: &PlacementRequest,
        identity: Option<&CustomerIdentity>,
    ) -> Result<PlacementReceipt, OrderError> {
        let resolved = request.validate(identity)?;
        if !self.currency.supports(&request.currency) {
            return Err(OrderError::UnsupportedCurrency(request.currency.clone()));
        }

        // One pricing instant for every line of this placement.
        let now = Utc::now();
        let mut product_ids: Vec<Uuid> = request.items.iter().map(|i| i.product).collect();
        product_ids.sort();
        product_ids.dedup();
        let campaigns = self.store.active_campaigns(&product_ids, now).await?;

        // Every early return below drops the transaction, which aborts it.
        let mut tx = self.store.begin().await?;

        let priced = OrderPricer::new(&self.currency)
            .price(tx.as_mut(), request, &campaigns, now, identity.is_some())
            .await?;

        for product in &priced.stock_writes {
            tx.store_product(product).await?;
        }
        for inc in &priced.sold_increments {
            tx.add_sold_count(inc.campaign_id, inc.product_id, inc.quantity)
                .await?;
        }

        let recipient = Recipient::from_contact(&resolved.contact, &request.shipping_address);
        tx.upsert_recipient(&recipient).await?;

        let mut order = Order {
            id: Uuid::new_v4(),
            order_number: self.order_numbers.next(),
            user_id: resolved.user_id,
            items: priced.lines,
            total_minor: priced.total_minor,
            currency: priced.currency,
            exchange_rate: priced.exchange_rate,
            shipping_address: request.shipping_address.clone(),
            customer_info: resolved.contact,
            payment_method: request.payment_method,
            payment_reference: request.payment_reference.clone(),
            status: OrderStatus::Pending,
            payment_status: derive_payment_status(request.payment_method, request.payment_status),
            created_at: now,
        };

        match tx.insert_order(&order).await {
            Ok(()) => {}
            Err(StoreError::DuplicateOrderNumber(collided)) => {
                order.order_number = self.order_numbers.retry();
                warn!(
                    collided,
                    retry = %order.order_number,
                    "order number collision, retrying once"
                );
                // A second collision surfaces as a conflict and aborts.
                tx.insert_order(&order).await?;
            }
            Err(err) => return Err(err.into()),
        }

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            total_minor = order.total_minor,
            currency = %order.currency,
            "order committed"
        );

        self.publisher.order_created(&order).await;
        let touched = order.touched_campaigns();
        if !touched.is_empty() {
            match self.store.campaigns_by_ids(&touched).await {
                Ok(campaigns) => {
                    let snapshots: Vec<FlashSaleSnapshot> =
                        campaigns.iter().map(FlashSaleSnapshot::from).collect();
                    self.publisher.flash_sale_updated(&snapshots).await;
                }
                Err(err) => warn!(error = %err, "failed to load flash sale snapshots"),
            }
        }

        Ok(PlacementReceipt {
            order_id: order.id,
            order_number: order.order_number,
            total_minor: order.total_minor,
            currency: order.currency,
            status: order.status,
            payment_status: order.payment_status,
            payment_reference: order.payment_reference,
        })
    }
}

/// Cash on delivery always starts pending; card orders are pending unless a
/// trusted caller asserts the gateway already captured the payment.
fn derive_payment_status(
    method: PaymentMethod,
    asserted: Option<AssertedPaymentStatus>,
) -> PaymentStatus {
    match (method, asserted) {
        (PaymentMethod::Cod, _) => PaymentStatus::Pending,
        (PaymentMethod::Card, Some(AssertedPaymentStatus::Completed)) => PaymentStatus::Completed,
        (PaymentMethod::Card, None) => PaymentStatus::Pending,
    }
}
