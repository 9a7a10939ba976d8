use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use souq_shared::currency::convert_minor;
use souq_shared::{ContactInfo, ShippingAddress};
use uuid::Uuid;

/// Fulfillment status of an order. Created as `Pending`; later transitions
/// happen through status-update operations, never re-pricing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Cod,
}

/// One priced line of an order. Immutable once the order exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price in the order's currency, minor units.
    pub unit_price_minor: i64,
    /// Name and image snapshot taken at placement time.
    pub name: String,
    pub image: Option<String>,
    pub size: Option<String>,
    /// Campaign that priced this line, when a flash price applied.
    pub flash_sale_id: Option<Uuid>,
    /// Pre-discount unit price, base currency, minor units.
    pub base_price_minor: i64,
    /// Applied flash price, base currency, minor units.
    pub flash_price_minor: Option<i64>,
}

impl OrderLineItem {
    pub fn line_total_minor(&self) -> i64 {
        self.unit_price_minor * self.quantity as i64
    }
}

/// A committed customer purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub items: Vec<OrderLineItem>,
    /// Always equals the sum of line totals; minor units, order currency.
    pub total_minor: i64,
    pub currency: String,
    /// Conversion rate captured at creation; never recomputed.
    pub exchange_rate: f64,
    pub shipping_address: ShippingAddress,
    pub customer_info: ContactInfo,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn subtotal_minor(&self) -> i64 {
        self.items.iter().map(OrderLineItem::line_total_minor).sum()
    }

    /// Total saved through flash pricing, in the order currency. Each line's
    /// saving is the converted base price minus the charged unit price, so
    /// `subtotal_pre_discount = total + savings` holds to the exact minor
    /// unit regardless of per-unit rounding.
    pub fn flash_savings_minor(&self) -> i64 {
        self.items
            .iter()
            .filter(|item| {
                item.flash_price_minor
                    .is_some_and(|flash| flash < item.base_price_minor)
            })
            .map(|item| {
                let base_converted = convert_minor(item.base_price_minor, self.exchange_rate);
                (base_converted - item.unit_price_minor).max(0) * item.quantity as i64
            })
            .sum()
    }

    /// Campaigns this order drew from, deduplicated.
    pub fn touched_campaigns(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.items.iter().filter_map(|i| i.flash_sale_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}
