use std::sync::Arc;

use souq_order::{CatalogStore, OrderCommitter, OrderDirectory};

#[derive(Clone)]
pub struct AppState {
    pub committer: Arc<OrderCommitter>,
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<dyn OrderDirectory>,
}
