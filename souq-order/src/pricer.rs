use std::collections::HashMap;

use chrono::{DateTime, Utc};
use souq_catalog::{
    FlashPricingEngine, FlashSaleCampaign, FlashSaleError, InventoryError, InventoryResolver,
    Product,
};
use souq_shared::currency::{convert_minor, CurrencyTable};
use uuid::Uuid;

use crate::error::OrderError;
use crate::models::OrderLineItem;
use crate::repository::PlacementTx;
use crate::request::PlacementRequest;

/// One staged `sold_count` increment, scoped to a campaign+product pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoldIncrement {
    pub campaign_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A fully priced order plus the staged mutations the committer will apply.
/// Nothing has been written yet when this exists.
#[derive(Debug, Clone)]
pub struct PricedOrder {
    pub lines: Vec<OrderLineItem>,
    pub total_minor: i64,
    pub currency: String,
    pub exchange_rate: f64,
    /// Product snapshots with decrements staged, in first-touch order. Each
    /// carries the version it was read at for the commit-time guard.
    pub stock_writes: Vec<Product>,
    pub sold_increments: Vec<SoldIncrement>,
}

/// Prices a placement request line by line: inventory resolution, flash-sale
/// pricing, currency conversion. Fails fast on the first invalid line; a
/// partial pricing is never returned.
pub struct OrderPricer<'a> {
    currency: &'a CurrencyTable,
}

impl<'a> OrderPricer<'a> {
    pub fn new(currency: &'a CurrencyTable) -> Self {
        Self { currency }
    }

    /// `now` is fixed by the caller so every line prices against the same
    /// instant. `identified` gates per-user flash limits.
    pub async fn price(
        &self,
        tx: &mut dyn PlacementTx,
        request: &PlacementRequest,
        campaigns: &[FlashSaleCampaign],
        now: DateTime<Utc>,
        identified: bool,
    ) -> Result<PricedOrder, OrderError> {
        let rate = self
            .currency
            .rate(&request.currency)
            .ok_or_else(|| OrderError::UnsupportedCurrency(request.currency.clone()))?;

        // Products staged so far; a later line for the same product sees the
        // earlier line's decrement.
        let mut staged: HashMap<Uuid, Product> = HashMap::new();
        let mut touch_order: Vec<Uuid> = Vec::new();
        // Quantities already priced per campaign+product within this order.
        let mut flash_in_order: HashMap<(Uuid, Uuid), i32> = HashMap::new();

        let mut lines = Vec::with_capacity(request.items.len());
        let mut sold_increments: Vec<SoldIncrement> = Vec::new();
        let mut total_minor: i64 = 0;

        for line in &request.items {
            if !staged.contains_key(&line.product) {
                let product = tx
                    .product(line.product)
                    .await?
                    .ok_or(OrderError::ProductNotFound(line.product))?;
                staged.insert(line.product, product);
                touch_order.push(line.product);
            }
            let product = staged.get_mut(&line.product).expect("staged above");

            let resolved =
                InventoryResolver::resolve(product, line.size.as_deref(), line.quantity).map_err(
                    |err| match err {
                        InventoryError::SizeNotFound { size } => OrderError::SizeNotFound {
                            product: product.name.clone(),
                            size,
                        },
                        InventoryError::InsufficientStock {
                            available,
                            requested,
                        } => OrderError::InsufficientStock {
                            product: product.name.clone(),
                            available,
                            requested,
                        },
                    },
                )?;

            let flash = FlashPricingEngine::resolve(product.id, campaigns, now);
            if let Some((campaign, item)) = flash {
                let already = flash_in_order
                    .get(&(campaign.id, product.id))
                    .copied()
                    .unwrap_or(0);
                FlashPricingEngine::check_limits(item, line.quantity, already, identified)
                    .map_err(|err| match err {
                        FlashSaleError::StockExceeded { remaining } => {
                            OrderError::FlashStockExceeded {
                                product: product.name.clone(),
                                remaining,
                            }
                        }
                        FlashSaleError::PerUserLimitExceeded { limit } => {
                            OrderError::FlashLimitExceeded {
                                product: product.name.clone(),
                                limit,
                            }
                        }
                        other => OrderError::Internal(other.to_string()),
                    })?;
                *flash_in_order
                    .entry((campaign.id, product.id))
                    .or_insert(0) += line.quantity;
                match sold_increments.iter_mut().find(|inc| {
                    inc.campaign_id == campaign.id && inc.product_id == product.id
                }) {
                    Some(inc) => inc.quantity += line.quantity,
                    None => sold_increments.push(SoldIncrement {
                        campaign_id: campaign.id,
                        product_id: product.id,
                        quantity: line.quantity,
                    }),
                }
            }

            let base_price_minor = product.price_minor;
            let flash_price_minor = flash.map(|(_, item)| item.flash_price_minor);
            let unit_base_minor = flash_price_minor.unwrap_or(base_price_minor);
            let unit_price_minor = convert_minor(unit_base_minor, rate);
            total_minor += unit_price_minor * line.quantity as i64;

            lines.push(OrderLineItem {
                product_id: product.id,
                quantity: line.quantity,
                unit_price_minor,
                name: product.name.clone(),
                image: product.primary_image().map(str::to_string),
                size: resolved.size.clone(),
                flash_sale_id: flash.map(|(campaign, _)| campaign.id),
                base_price_minor,
                flash_price_minor,
            });

            resolved.stage(product, line.quantity);
        }

        let stock_writes = touch_order
            .into_iter()
            .map(|id| staged.remove(&id).expect("touched products are staged"))
            .collect();

        Ok(PricedOrder {
            lines,
            total_minor,
            currency: request.currency.clone(),
            exchange_rate: rate,
            stock_writes,
            sold_increments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;
    use crate::repository::StoreError;
    use crate::request::{CustomerContact, LineRequest};
    use async_trait::async_trait;
    use chrono::Duration;
    use souq_catalog::{FlashSaleItem, SizeStock};
    use souq_shared::{Recipient, ShippingAddress};

    struct FakeTx {
        products: HashMap<Uuid, Product>,
    }

    #[async_trait]
    impl PlacementTx for FakeTx {
        async fn product(&mut self, id: Uuid) -> Result<Option<Product>, StoreError> {
            Ok(self.products.get(&id).cloned())
        }

        async fn store_product(&mut self, _product: &Product) -> Result<(), StoreError> {
            unreachable!("pricing never writes")
        }

        async fn add_sold_count(
            &mut self,
            _campaign_id: Uuid,
            _product_id: Uuid,
            _quantity: i32,
        ) -> Result<(), StoreError> {
            unreachable!("pricing never writes")
        }

        async fn upsert_recipient(&mut self, _recipient: &Recipient) -> Result<(), StoreError> {
            unreachable!("pricing never writes")
        }

        async fn insert_order(
            &mut self,
            _order: &crate::models::Order,
        ) -> Result<(), StoreError> {
            unreachable!("pricing never writes")
        }

        async fn commit(self: Box<Self>) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn product(price_minor: i64, stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Linen Shirt".to_string(),
            price_minor,
            stock,
            sizes: vec![],
            colors: vec![],
            images: vec!["shirt.jpg".to_string()],
            version: 1,
        }
    }

    fn request(items: Vec<LineRequest>, currency: &str) -> PlacementRequest {
        PlacementRequest {
            items,
            shipping_address: ShippingAddress {
                street: "1 Main".to_string(),
                city: "Amman".to_string(),
                country: "JO".to_string(),
            },
            payment_method: PaymentMethod::Card,
            currency: currency.to_string(),
            customer_info: CustomerContact::default(),
            payment_status: None,
            payment_reference: None,
        }
    }

    fn flash_campaign(product_id: Uuid, flash_price_minor: i64, now: DateTime<Utc>) -> FlashSaleCampaign {
        FlashSaleCampaign {
            id: Uuid::new_v4(),
            title: "Flash".to_string(),
            description: None,
            start_date: now - Duration::hours(1),
            end_date: now + Duration::hours(1),
            items: vec![FlashSaleItem {
                product_id,
                flash_price_minor,
                stock_limit: Some(10),
                per_user_limit: None,
                sold_count: 0,
            }],
        }
    }

    #[tokio::test]
    async fn test_flash_price_and_conversion() {
        // Scenario A: base 100.00, flash 80.00, qty 3, USD rate 1.0.
        let p = product(10000, 50);
        let now = Utc::now();
        let campaigns = vec![flash_campaign(p.id, 8000, now)];
        let table = CurrencyTable::with_defaults();
        let mut tx = FakeTx {
            products: HashMap::from([(p.id, p.clone())]),
        };

        let req = request(
            vec![LineRequest {
                product: p.id,
                quantity: 3,
                size: None,
            }],
            "USD",
        );
        let priced = OrderPricer::new(&table)
            .price(&mut tx, &req, &campaigns, now, false)
            .await
            .unwrap();

        assert_eq!(priced.lines[0].unit_price_minor, 8000);
        assert_eq!(priced.total_minor, 24000);
        assert_eq!(priced.lines[0].base_price_minor, 10000);
        assert_eq!(priced.lines[0].flash_price_minor, Some(8000));
        assert_eq!(priced.sold_increments.len(), 1);
        assert_eq!(priced.sold_increments[0].quantity, 3);
        assert_eq!(priced.stock_writes[0].stock, 47);
    }

    #[tokio::test]
    async fn test_total_is_exact_integer_sum() {
        let p = product(999, 10);
        let now = Utc::now();
        let table = CurrencyTable::with_defaults();
        let mut tx = FakeTx {
            products: HashMap::from([(p.id, p.clone())]),
        };

        let req = request(
            vec![LineRequest {
                product: p.id,
                quantity: 3,
                size: None,
            }],
            "EUR",
        );
        let priced = OrderPricer::new(&table)
            .price(&mut tx, &req, &[], now, false)
            .await
            .unwrap();

        // Converted per unit first (999 * 0.92 -> 919), then multiplied.
        assert_eq!(priced.lines[0].unit_price_minor, 919);
        assert_eq!(priced.total_minor, 919 * 3);
    }

    #[tokio::test]
    async fn test_unsupported_currency() {
        let table = CurrencyTable::with_defaults();
        let mut tx = FakeTx {
            products: HashMap::new(),
        };
        let req = request(
            vec![LineRequest {
                product: Uuid::new_v4(),
                quantity: 1,
                size: None,
            }],
            "XXX",
        );
        let err = OrderPricer::new(&table)
            .price(&mut tx, &req, &[], Utc::now(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::UnsupportedCurrency(_)));
    }

    #[tokio::test]
    async fn test_missing_product() {
        let table = CurrencyTable::with_defaults();
        let mut tx = FakeTx {
            products: HashMap::new(),
        };
        let missing = Uuid::new_v4();
        let req = request(
            vec![LineRequest {
                product: missing,
                quantity: 1,
                size: None,
            }],
            "USD",
        );
        let err = OrderPricer::new(&table)
            .price(&mut tx, &req, &[], Utc::now(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::ProductNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_second_line_sees_first_lines_decrement() {
        let mut p = product(1000, 3);
        p.sizes = vec![SizeStock {
            name: "M".to_string(),
            stock: 3,
        }];
        let now = Utc::now();
        let table = CurrencyTable::with_defaults();
        let mut tx = FakeTx {
            products: HashMap::from([(p.id, p.clone())]),
        };

        let req = request(
            vec![
                LineRequest {
                    product: p.id,
                    quantity: 2,
                    size: Some("M".to_string()),
                },
                LineRequest {
                    product: p.id,
                    quantity: 2,
                    size: Some("M".to_string()),
                },
            ],
            "USD",
        );
        let err = OrderPricer::new(&table)
            .price(&mut tx, &req, &[], now, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_combined_lines_respect_flash_stock_limit() {
        // Scenario D: two lines for the same flash product, combined past the
        // stock limit.
        let p = product(10000, 50);
        let now = Utc::now();
        let mut campaign = flash_campaign(p.id, 8000, now);
        campaign.items[0].stock_limit = Some(3);
        let table = CurrencyTable::with_defaults();
        let mut tx = FakeTx {
            products: HashMap::from([(p.id, p.clone())]),
        };

        let req = request(
            vec![
                LineRequest {
                    product: p.id,
                    quantity: 2,
                    size: None,
                },
                LineRequest {
                    product: p.id,
                    quantity: 2,
                    size: None,
                },
            ],
            "USD",
        );
        let err = OrderPricer::new(&table)
            .price(&mut tx, &req, &[campaign], now, false)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::FlashStockExceeded { remaining: 1, .. }));
    }
}
