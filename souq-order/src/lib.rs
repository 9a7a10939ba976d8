pub mod committer;
pub mod error;
pub mod events;
pub mod models;
pub mod pricer;
pub mod repository;
pub mod request;

pub use committer::{OrderCommitter, OrderNumberGenerator, PlacementReceipt, TimestampOrderNumbers};
pub use error::OrderError;
pub use events::{FlashSaleSnapshot, OrderEventPublisher};
pub use models::{Order, OrderLineItem, OrderStatus, PaymentMethod, PaymentStatus};
pub use pricer::{OrderPricer, PricedOrder};
pub use repository::{CatalogStore, OrderDirectory, PlacementStore, PlacementTx, StoreError};
pub use request::{LineRequest, PlacementRequest};
