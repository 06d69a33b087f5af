use std::sync::Arc;

use anyhow::Context;
use clinic_service::bootstrap::ensure_superadmin;
use clinic_service::config::{load_service_config, StorageBackend};
use clinic_service::store::{DocumentStore, MemoryStore, PgStore};
use clinic_service::{build_router, AppState};
use common_observability::init_tracing;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config = load_service_config()?;

    let store: Arc<dyn DocumentStore> = match &config.storage {
        StorageBackend::Memory => {
            warn!("using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Postgres(url) => {
            let store = PgStore::connect(url)
                .await
                .context("Failed to connect to Postgres")?;
            store.migrate().await.context("Failed to run migrations")?;
            Arc::new(store)
        }
    };

    let state = AppState::new(config, store)?;

    if let Some(admin) = &state.config.bootstrap {
        ensure_superadmin(&state.credentials, admin).await?;
    }

    let addr = state.config.socket_addr();
    let app = build_router(state);

    info!(%addr, "starting clinic-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
