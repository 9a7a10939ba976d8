use std::net::SocketAddr;
use std::sync::Arc;

use souq_api::{app, AppState};
use souq_order::OrderCommitter;
use souq_store::PgStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "souq_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = souq_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Souq API on port {}", config.server.port);

    let db = souq_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let kafka_producer = souq_store::EventProducer::new(&config.kafka.brokers)
        .expect("Failed to create Kafka producer");

    let store = Arc::new(PgStore::new(db.pool.clone()));
    let committer = OrderCommitter::new(
        store.clone(),
        Arc::new(kafka_producer),
        config.storefront.currency_table(),
    );

    let app_state = AppState {
        committer: Arc::new(committer),
        catalog: store.clone(),
        orders: store,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
