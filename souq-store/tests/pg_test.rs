//! Placement tests against a live Postgres. Run with:
//! `DATABASE_URL=postgres://... cargo test -p souq-store -- --ignored`

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use souq_order::committer::{OrderCommitter, OrderNumberGenerator};
use souq_order::events::{FlashSaleSnapshot, OrderEventPublisher};
use souq_order::models::{Order, PaymentMethod};
use souq_order::request::{CustomerContact, LineRequest, PlacementRequest};
use souq_order::OrderError;
use souq_shared::{CurrencyTable, ShippingAddress};
use souq_store::{DbClient, PgStore};

struct NullPublisher;

#[async_trait]
impl OrderEventPublisher for NullPublisher {
    async fn order_created(&self, _order: &Order) {}
    async fn flash_sale_updated(&self, _sales: &[FlashSaleSnapshot]) {}
}

struct FixedOrderNumbers {
    base: String,
    suffixed: String,
}

impl OrderNumberGenerator for FixedOrderNumbers {
    fn next(&self) -> String {
        self.base.clone()
    }

    fn retry(&self) -> String {
        self.suffixed.clone()
    }
}

fn request(product_id: Uuid) -> PlacementRequest {
    PlacementRequest {
        items: vec![LineRequest {
            product: product_id,
            quantity: 1,
            size: None,
        }],
        shipping_address: ShippingAddress {
            street: "1 Rainbow St".to_string(),
            city: "Amman".to_string(),
            country: "JO".to_string(),
        },
        payment_method: PaymentMethod::Cod,
        currency: "USD".to_string(),
        customer_info: CustomerContact {
            email: Some("buyer@example.com".to_string()),
            mobile: Some("0791234567".to_string()),
            ..Default::default()
        },
        payment_status: None,
        payment_reference: None,
    }
}

#[tokio::test]
#[ignore = "needs a live Postgres via DATABASE_URL"]
async fn order_number_collision_retries_once_on_postgres() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let db = DbClient::new(&url).await.unwrap();
    db.migrate().await.unwrap();

    let product_id = Uuid::new_v4();
    sqlx::query("INSERT INTO products (id, name, price_minor, stock) VALUES ($1, $2, $3, $4)")
        .bind(product_id)
        .bind("Linen Shirt")
        .bind(5000i64)
        .bind(50)
        .execute(&db.pool)
        .await
        .unwrap();

    let store = Arc::new(PgStore::new(db.pool.clone()));
    let tag = Uuid::new_v4().simple().to_string();
    let base = format!("ORD-{tag}");
    let suffixed = format!("ORD-{tag}-777");
    let make = || {
        OrderCommitter::new(
            store.clone(),
            Arc::new(NullPublisher),
            CurrencyTable::with_defaults(),
        )
        .with_order_numbers(Box::new(FixedOrderNumbers {
            base: base.clone(),
            suffixed: suffixed.clone(),
        }))
    };

    // First placement takes the base number.
    let first = make().place(&request(product_id), None).await.unwrap();
    assert_eq!(first.order_number, base);

    // The collision must not poison the transaction: the retry with the
    // suffixed number has to commit inside the same transaction.
    let second = make().place(&request(product_id), None).await.unwrap();
    assert_eq!(second.order_number, suffixed);

    // Both collide: fatal, and the stock decrement rolls back with it.
    let err = make().place(&request(product_id), None).await.unwrap_err();
    assert!(matches!(err, OrderError::Conflict(_)));

    let row = sqlx::query("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    let stock: i32 = row.try_get("stock").unwrap();
    assert_eq!(stock, 48);
}
