//! Postgres-backed stores. All placement writes run inside one sqlx
//! transaction; stock writes are version-guarded and sold-count increments
//! re-check their limit in the UPDATE predicate, so concurrent placements
//! surface as conflicts instead of oversell.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use souq_catalog::{FlashSaleCampaign, FlashSaleItem, Product};
use souq_order::models::{Order, OrderLineItem, OrderStatus, PaymentMethod, PaymentStatus};
use souq_order::repository::{
    CatalogStore, OrderDirectory, PlacementStore, PlacementTx, StoreError,
};
use souq_shared::{Recipient, ShippingAddress};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn json_column<T: serde::de::DeserializeOwned>(
    row: &PgRow,
    column: &str,
) -> Result<T, StoreError> {
    let value: serde_json::Value = row.try_get(column).map_err(backend)?;
    serde_json::from_value(value)
        .map_err(|e| StoreError::Backend(format!("bad {column} payload: {e}")))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: row.try_get("id").map_err(backend)?,
        name: row.try_get("name").map_err(backend)?,
        price_minor: row.try_get("price_minor").map_err(backend)?,
        stock: row.try_get("stock").map_err(backend)?,
        sizes: json_column(row, "sizes")?,
        colors: json_column(row, "colors")?,
        images: json_column(row, "images")?,
        version: row.try_get("version").map_err(backend)?,
    })
}

fn item_from_row(row: &PgRow) -> Result<FlashSaleItem, StoreError> {
    Ok(FlashSaleItem {
        product_id: row.try_get("product_id").map_err(backend)?,
        flash_price_minor: row.try_get("flash_price_minor").map_err(backend)?,
        stock_limit: row.try_get("stock_limit").map_err(backend)?,
        per_user_limit: row.try_get("per_user_limit").map_err(backend)?,
        sold_count: row.try_get("sold_count").map_err(backend)?,
    })
}

fn order_status_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "pending",
        OrderStatus::Processing => "processing",
        OrderStatus::Shipped => "shipped",
        OrderStatus::Delivered => "delivered",
        OrderStatus::Cancelled => "cancelled",
    }
}

fn order_status_from(s: &str) -> Result<OrderStatus, StoreError> {
    match s {
        "pending" => Ok(OrderStatus::Pending),
        "processing" => Ok(OrderStatus::Processing),
        "shipped" => Ok(OrderStatus::Shipped),
        "delivered" => Ok(OrderStatus::Delivered),
        "cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(StoreError::Backend(format!("unknown order status: {other}"))),
    }
}

fn payment_status_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Completed => "completed",
        PaymentStatus::Failed => "failed",
        PaymentStatus::Refunded => "refunded",
    }
}

fn payment_status_from(s: &str) -> Result<PaymentStatus, StoreError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "completed" => Ok(PaymentStatus::Completed),
        "failed" => Ok(PaymentStatus::Failed),
        "refunded" => Ok(PaymentStatus::Refunded),
        other => Err(StoreError::Backend(format!(
            "unknown payment status: {other}"
        ))),
    }
}

fn payment_method_str(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Card => "card",
        PaymentMethod::Cod => "cod",
    }
}

fn payment_method_from(s: &str) -> Result<PaymentMethod, StoreError> {
    match s {
        "card" => Ok(PaymentMethod::Card),
        "cod" => Ok(PaymentMethod::Cod),
        other => Err(StoreError::Backend(format!(
            "unknown payment method: {other}"
        ))),
    }
}

pub struct PgPlacementTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl PlacementTx for PgPlacementTx {
    async fn product(&mut self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, price_minor, stock, sizes, colors, images, version \
             FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(backend)?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn store_product(&mut self, product: &Product) -> Result<(), StoreError> {
        let sizes = serde_json::to_value(&product.sizes)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE products \
             SET stock = $1, sizes = $2, version = version + 1, updated_at = NOW() \
             WHERE id = $3 AND version = $4",
        )
        .bind(product.stock)
        .bind(sizes)
        .bind(product.id)
        .bind(product.version)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "product {} was modified concurrently",
                product.id
            )));
        }
        Ok(())
    }

    async fn add_sold_count(
        &mut self,
        campaign_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE flash_sale_items \
             SET sold_count = sold_count + $1 \
             WHERE campaign_id = $2 AND product_id = $3 \
               AND (stock_limit IS NULL OR sold_count + $1 <= stock_limit)",
        )
        .bind(quantity)
        .bind(campaign_id)
        .bind(product_id)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "flash sale stock limit exceeded for product {product_id}"
            )));
        }
        Ok(())
    }

    async fn upsert_recipient(&mut self, recipient: &Recipient) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO recipients \
             (email, mobile, first_name, last_name, secondary_mobile, street, city, country) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (email, mobile) DO UPDATE SET \
               first_name = EXCLUDED.first_name, \
               last_name = EXCLUDED.last_name, \
               secondary_mobile = EXCLUDED.secondary_mobile, \
               street = EXCLUDED.street, \
               city = EXCLUDED.city, \
               country = EXCLUDED.country, \
               updated_at = NOW()",
        )
        .bind(&recipient.email)
        .bind(&recipient.mobile)
        .bind(&recipient.first_name)
        .bind(&recipient.last_name)
        .bind(&recipient.secondary_mobile)
        .bind(&recipient.address.street)
        .bind(&recipient.address.city)
        .bind(&recipient.address.country)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        // A bare unique violation would abort the whole transaction, leaving
        // nothing for the caller's retry to run in. DO NOTHING keeps the
        // transaction live and reports the collision through rows_affected.
        let result = sqlx::query(
            "INSERT INTO orders \
             (id, order_number, user_id, total_minor, currency, exchange_rate, \
              street, city, country, first_name, last_name, email, mobile, \
              secondary_mobile, payment_method, payment_reference, status, \
              payment_status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, \
                     $14, $15, $16, $17, $18, $19) \
             ON CONFLICT (order_number) DO NOTHING",
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.total_minor)
        .bind(&order.currency)
        .bind(order.exchange_rate)
        .bind(&order.shipping_address.street)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.country)
        .bind(&order.customer_info.first_name)
        .bind(&order.customer_info.last_name)
        .bind(&order.customer_info.email)
        .bind(&order.customer_info.mobile)
        .bind(&order.customer_info.secondary_mobile)
        .bind(payment_method_str(order.payment_method))
        .bind(&order.payment_reference)
        .bind(order_status_str(order.status))
        .bind(payment_status_str(order.payment_status))
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::DuplicateOrderNumber(order.order_number.clone()));
        }

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items \
                 (id, order_id, product_id, quantity, unit_price_minor, name, image, \
                  size, flash_sale_id, base_price_minor, flash_price_minor, position) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(Uuid::new_v4())
            .bind(order.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_minor)
            .bind(&item.name)
            .bind(&item.image)
            .bind(&item.size)
            .bind(item.flash_sale_id)
            .bind(item.base_price_minor)
            .bind(item.flash_price_minor)
            .bind(position as i32)
            .execute(&mut *self.tx)
            .await
            .map_err(backend)?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(backend)
    }
}

impl PgStore {
    async fn campaign_items(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<FlashSaleItem>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, flash_price_minor, stock_limit, per_user_limit, sold_count \
             FROM flash_sale_items WHERE campaign_id = $1",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(item_from_row).collect()
    }

    async fn campaigns_from_rows(
        &self,
        rows: Vec<PgRow>,
    ) -> Result<Vec<FlashSaleCampaign>, StoreError> {
        let mut campaigns = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.try_get("id").map_err(backend)?;
            campaigns.push(FlashSaleCampaign {
                id,
                title: row.try_get("title").map_err(backend)?,
                description: row.try_get("description").map_err(backend)?,
                start_date: row.try_get("start_date").map_err(backend)?,
                end_date: row.try_get("end_date").map_err(backend)?,
                items: self.campaign_items(id).await?,
            });
        }
        Ok(campaigns)
    }
}

#[async_trait]
impl PlacementStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn PlacementTx>, StoreError> {
        let tx = self.pool.begin().await.map_err(backend)?;
        Ok(Box::new(PgPlacementTx { tx }))
    }

    async fn active_campaigns(
        &self,
        product_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Vec<FlashSaleCampaign>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, description, start_date, end_date \
             FROM flash_sales \
             WHERE start_date <= $1 AND end_date >= $1 \
               AND id IN (SELECT campaign_id FROM flash_sale_items WHERE product_id = ANY($2))",
        )
        .bind(now)
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        self.campaigns_from_rows(rows).await
    }

    async fn campaigns_by_ids(&self, ids: &[Uuid]) -> Result<Vec<FlashSaleCampaign>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, description, start_date, end_date \
             FROM flash_sales WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        self.campaigns_from_rows(rows).await
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, price_minor, stock, sizes, colors, images, version \
             FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn create_campaign(&self, campaign: &FlashSaleCampaign) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query(
            "INSERT INTO flash_sales (id, title, description, start_date, end_date) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(campaign.id)
        .bind(&campaign.title)
        .bind(&campaign.description)
        .bind(campaign.start_date)
        .bind(campaign.end_date)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        for item in &campaign.items {
            sqlx::query(
                "INSERT INTO flash_sale_items \
                 (campaign_id, product_id, flash_price_minor, stock_limit, per_user_limit, sold_count) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(campaign.id)
            .bind(item.product_id)
            .bind(item.flash_price_minor)
            .bind(item.stock_limit)
            .bind(item.per_user_limit)
            .bind(item.sold_count)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)
    }

    async fn campaign(&self, id: Uuid) -> Result<Option<FlashSaleCampaign>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, description, start_date, end_date \
             FROM flash_sales WHERE id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(self.campaigns_from_rows(rows).await?.into_iter().next())
    }

    async fn update_campaign(&self, campaign: &FlashSaleCampaign) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let result = sqlx::query(
            "UPDATE flash_sales \
             SET title = $1, description = $2, start_date = $3, end_date = $4 \
             WHERE id = $5",
        )
        .bind(&campaign.title)
        .bind(&campaign.description)
        .bind(campaign.start_date)
        .bind(campaign.end_date)
        .bind(campaign.id)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "flash sale {} no longer exists",
                campaign.id
            )));
        }

        sqlx::query("DELETE FROM flash_sale_items WHERE campaign_id = $1")
            .bind(campaign.id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        for item in &campaign.items {
            sqlx::query(
                "INSERT INTO flash_sale_items \
                 (campaign_id, product_id, flash_price_minor, stock_limit, per_user_limit, sold_count) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(campaign.id)
            .bind(item.product_id)
            .bind(item.flash_price_minor)
            .bind(item.stock_limit)
            .bind(item.per_user_limit)
            .bind(item.sold_count)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)
    }

    async fn campaigns(&self) -> Result<Vec<FlashSaleCampaign>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, description, start_date, end_date \
             FROM flash_sales ORDER BY start_date",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        self.campaigns_from_rows(rows).await
    }
}

#[async_trait]
impl OrderDirectory for PgStore {
    async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            "SELECT id, order_number, user_id, total_minor, currency, exchange_rate, \
                    street, city, country, first_name, last_name, email, mobile, \
                    secondary_mobile, payment_method, payment_reference, status, \
                    payment_status, created_at \
             FROM orders WHERE order_number = $1",
        )
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let order_id: Uuid = row.try_get("id").map_err(backend)?;
        let item_rows = sqlx::query(
            "SELECT product_id, quantity, unit_price_minor, name, image, size, \
                    flash_sale_id, base_price_minor, flash_price_minor \
             FROM order_items WHERE order_id = $1 ORDER BY position",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let items = item_rows
            .iter()
            .map(|r| {
                Ok(OrderLineItem {
                    product_id: r.try_get("product_id").map_err(backend)?,
                    quantity: r.try_get("quantity").map_err(backend)?,
                    unit_price_minor: r.try_get("unit_price_minor").map_err(backend)?,
                    name: r.try_get("name").map_err(backend)?,
                    image: r.try_get("image").map_err(backend)?,
                    size: r.try_get("size").map_err(backend)?,
                    flash_sale_id: r.try_get("flash_sale_id").map_err(backend)?,
                    base_price_minor: r.try_get("base_price_minor").map_err(backend)?,
                    flash_price_minor: r.try_get("flash_price_minor").map_err(backend)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let status: String = row.try_get("status").map_err(backend)?;
        let payment_status: String = row.try_get("payment_status").map_err(backend)?;
        let payment_method: String = row.try_get("payment_method").map_err(backend)?;

        Ok(Some(Order {
            id: order_id,
            order_number: row.try_get("order_number").map_err(backend)?,
            user_id: row.try_get("user_id").map_err(backend)?,
            items,
            total_minor: row.try_get("total_minor").map_err(backend)?,
            currency: row.try_get("currency").map_err(backend)?,
            exchange_rate: row.try_get("exchange_rate").map_err(backend)?,
            shipping_address: ShippingAddress {
                street: row.try_get("street").map_err(backend)?,
                city: row.try_get("city").map_err(backend)?,
                country: row.try_get("country").map_err(backend)?,
            },
            customer_info: souq_shared::ContactInfo {
                first_name: row.try_get("first_name").map_err(backend)?,
                last_name: row.try_get("last_name").map_err(backend)?,
                email: row.try_get("email").map_err(backend)?,
                mobile: row.try_get("mobile").map_err(backend)?,
                secondary_mobile: row.try_get("secondary_mobile").map_err(backend)?,
            },
            payment_method: payment_method_from(&payment_method)?,
            payment_reference: row.try_get("payment_reference").map_err(backend)?,
            status: order_status_from(&status)?,
            payment_status: payment_status_from(&payment_status)?,
            created_at: row.try_get("created_at").map_err(backend)?,
        }))
    }
}
