//! Storefront Cart - shopping cart service

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_cart::api::{self, AppState, DenyAll, IdentityVerifier, JwtVerifier};
use storefront_cart::config::Config;
use storefront_cart::events::EventPublisher;
use storefront_cart::repository::{MemoryStore, PgStore};
use storefront_cart::service::CartService;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, cart events disabled"); None }
        },
        None => None,
    };
    let events = EventPublisher::new(nats);
    tracing::info!(enabled = events.is_enabled(), "cart event publishing");

    let service = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(config.db_max_connections).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            let store = Arc::new(PgStore::new(db));
            CartService::new(store.clone(), store.clone(), store, events)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, carts are kept in memory and lost on restart");
            let store = Arc::new(MemoryStore::new());
            CartService::new(store.clone(), store.clone(), store, events)
        }
    };

    let verifier: Arc<dyn IdentityVerifier> = match &config.jwt_secret {
        Some(secret) => Arc::new(JwtVerifier::new(secret)),
        None => { tracing::warn!("JWT_SECRET not set, every cart request will be rejected"); Arc::new(DenyAll) }
    };

    let app = api::router(AppState { service: Arc::new(service), verifier });
    tracing::info!("🛒 Storefront cart listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
