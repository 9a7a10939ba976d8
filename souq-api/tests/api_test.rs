use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use souq_api::{app, AppState};
use souq_catalog::Product;
use souq_order::events::{FlashSaleSnapshot, OrderEventPublisher};
use souq_order::models::Order;
use souq_order::OrderCommitter;
use souq_shared::CurrencyTable;
use souq_store::MemoryStore;

struct NullPublisher;

#[async_trait::async_trait]
impl OrderEventPublisher for NullPublisher {
    async fn order_created(&self, _order: &Order) {}
    async fn flash_sale_updated(&self, _sales: &[FlashSaleSnapshot]) {}
}

fn test_app(store: &MemoryStore) -> axum::Router {
    let committer = OrderCommitter::new(
        Arc::new(store.clone()),
        Arc::new(NullPublisher),
        CurrencyTable::with_defaults(),
    );
    app(AppState {
        committer: Arc::new(committer),
        catalog: Arc::new(store.clone()),
        orders: Arc::new(store.clone()),
    })
}

fn seed_product(store: &MemoryStore, price_minor: i64, stock: i32) -> Uuid {
    let id = Uuid::new_v4();
    store.insert_product(Product {
        id,
        name: "Linen Shirt".to_string(),
        price_minor,
        stock,
        sizes: vec![],
        colors: vec![],
        images: vec![],
        version: 0,
    });
    id
}

fn order_body(product_id: Uuid) -> Value {
    json!({
        "items": [{"product": product_id, "quantity": 2, "size": null}],
        "shippingAddress": {"street": "1 Main", "city": "Amman", "country": "JO"},
        "paymentMethod": "cod",
        "currency": "USD",
        "customerInfo": {"email": "buyer@example.com", "mobile": "0791234567"}
    })
}

async fn json_response(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn place_and_fetch_order() {
    let store = MemoryStore::new();
    let product_id = seed_product(&store, 5000, 10);

    let response = test_app(&store)
        .oneshot(
            Request::post("/api/orders")
                .header("content-type", "application/json")
                .body(Body::from(order_body(product_id).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = json_response(response).await;
    assert_eq!(receipt["totalAmount"], 10000);
    assert_eq!(receipt["paymentStatus"], "pending");
    let order_number = receipt["orderNumber"].as_str().unwrap().to_string();

    let response = test_app(&store)
        .oneshot(
            Request::get(format!("/api/orders/{order_number}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let detail = json_response(response).await;
    assert_eq!(detail["orderNumber"], order_number.as_str());
    assert_eq!(detail["totals"]["subtotalMinor"], 10000);
    assert_eq!(detail["totals"]["promotionsMinor"], 0);
    assert_eq!(detail["totals"]["totalMinor"], 10000);
}

#[tokio::test]
async fn unknown_order_is_404() {
    let store = MemoryStore::new();
    let response = test_app(&store)
        .oneshot(
            Request::get("/api/orders/ORD0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversell_is_rejected_with_400() {
    let store = MemoryStore::new();
    let product_id = seed_product(&store, 5000, 1);

    let response = test_app(&store)
        .oneshot(
            Request::post("/api/orders")
                .header("content-type", "application/json")
                .body(Body::from(order_body(product_id).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_response(response).await;
    assert!(body["error"].as_str().unwrap().contains("Insufficient stock")
        || body["error"].as_str().unwrap().contains("insufficient stock"));
}

#[tokio::test]
async fn flash_sale_create_and_filtered_list() {
    let store = MemoryStore::new();
    let product_id = seed_product(&store, 10000, 50);
    let now = Utc::now();

    // Flash price at base price is rejected.
    let bad = json!({
        "title": "Summer Flash",
        "startDate": now - Duration::hours(1),
        "endDate": now + Duration::hours(1),
        "items": [{"productId": product_id, "flashPriceMinor": 10000}]
    });
    let response = test_app(&store)
        .oneshot(
            Request::post("/api/flash-sales")
                .header("content-type", "application/json")
                .body(Body::from(bad.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let good = json!({
        "title": "Summer Flash",
        "startDate": now - Duration::hours(1),
        "endDate": now + Duration::hours(1),
        "items": [{"productId": product_id, "flashPriceMinor": 8000, "stockLimit": 10}]
    });
    let response = test_app(&store)
        .oneshot(
            Request::post("/api/flash-sales")
                .header("content-type", "application/json")
                .body(Body::from(good.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_response(response).await;
    assert_eq!(created["status"], "active");

    let response = test_app(&store)
        .oneshot(
            Request::get("/api/flash-sales?status=active")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed = json_response(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = test_app(&store)
        .oneshot(
            Request::get("/api/flash-sales?status=expired")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed = json_response(response).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn flash_sale_update_revalidates_and_merges() {
    let store = MemoryStore::new();
    let product_id = seed_product(&store, 10000, 50);
    let now = Utc::now();

    let campaign_id = Uuid::new_v4();
    store.insert_campaign(souq_catalog::FlashSaleCampaign {
        id: campaign_id,
        title: "Summer Flash".to_string(),
        description: None,
        start_date: now - Duration::hours(1),
        end_date: now + Duration::hours(1),
        items: vec![souq_catalog::FlashSaleItem {
            product_id,
            flash_price_minor: 8000,
            stock_limit: Some(10),
            per_user_limit: None,
            sold_count: 3,
        }],
    });

    // Field-only update keeps the items and their sold counters.
    let response = test_app(&store)
        .oneshot(
            Request::put(format!("/api/flash-sales/{campaign_id}"))
                .header("content-type", "application/json")
                .body(Body::from(json!({"title": "Extended Flash"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = json_response(response).await;
    assert_eq!(updated["title"], "Extended Flash");
    assert_eq!(updated["items"][0]["soldCount"], 3);

    // Replacing items resets counters and re-checks prices.
    let response = test_app(&store)
        .oneshot(
            Request::put(format!("/api/flash-sales/{campaign_id}"))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"items": [{"productId": product_id, "flashPriceMinor": 7000}]})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = json_response(response).await;
    assert_eq!(updated["items"][0]["flashPriceMinor"], 7000);
    assert_eq!(updated["items"][0]["soldCount"], 0);

    // A flash price at or above base is rejected and nothing changes.
    let response = test_app(&store)
        .oneshot(
            Request::put(format!("/api/flash-sales/{campaign_id}"))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"items": [{"productId": product_id, "flashPriceMinor": 10000}]})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let kept = store.campaign_snapshot(campaign_id).unwrap();
    assert_eq!(kept.items[0].flash_price_minor, 7000);

    // Unknown campaign id.
    let response = test_app(&store)
        .oneshot(
            Request::put(format!("/api/flash-sales/{}", Uuid::new_v4()))
                .header("content-type", "application/json")
                .body(Body::from(json!({"title": "Ghost"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn flash_price_applies_to_placed_order() {
    let store = MemoryStore::new();
    let product_id = seed_product(&store, 10000, 50);
    let now = Utc::now();

    store.insert_campaign(souq_catalog::FlashSaleCampaign {
        id: Uuid::new_v4(),
        title: "Summer Flash".to_string(),
        description: None,
        start_date: now - Duration::hours(1),
        end_date: now + Duration::hours(1),
        items: vec![souq_catalog::FlashSaleItem {
            product_id,
            flash_price_minor: 8000,
            stock_limit: Some(10),
            per_user_limit: None,
            sold_count: 0,
        }],
    });

    let response = test_app(&store)
        .oneshot(
            Request::post("/api/orders")
                .header("content-type", "application/json")
                .body(Body::from(order_body(product_id).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = json_response(response).await;
    assert_eq!(receipt["totalAmount"], 16000);

    let order_number = receipt["orderNumber"].as_str().unwrap().to_string();
    let response = test_app(&store)
        .oneshot(
            Request::get(format!("/api/orders/{order_number}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let detail = json_response(response).await;
    // 2 units saved 2000 each.
    assert_eq!(detail["totals"]["subtotalMinor"], 20000);
    assert_eq!(detail["totals"]["promotionsMinor"], -4000);
    assert_eq!(detail["totals"]["totalMinor"], 16000);
}
