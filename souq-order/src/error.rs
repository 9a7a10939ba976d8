use uuid::Uuid;

use crate::repository::StoreError;

/// Everything that can go wrong while placing an order.
///
/// Pricing-stage variants are detected before any write; commit-stage
/// variants always abort the whole transaction. No variant ever leaves
/// partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("size '{size}' not found for product {product}")]
    SizeNotFound { product: String, size: String },

    #[error("insufficient stock for {product}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    #[error("flash sale stock exceeded for product {product}. Remaining: {remaining}")]
    FlashStockExceeded { product: String, remaining: i32 },

    #[error("per-user limit ({limit}) exceeded for product {product}")]
    FlashLimitExceeded { product: String, limit: i32 },

    #[error("invalid currency: {0}")]
    UnsupportedCurrency(String),

    #[error("order could not be applied: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Internal(String),
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => OrderError::Conflict(msg),
            StoreError::DuplicateOrderNumber(number) => {
                OrderError::Conflict(format!("duplicate order number: {number}"))
            }
            StoreError::Backend(msg) => OrderError::Internal(msg),
        }
    }
}
