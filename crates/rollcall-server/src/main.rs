//! Main entry point for the Rollcall registry server.

use std::sync::Arc;

use rollcall_migration::{Migrator, MigratorTrait};
use rollcall_persistence::{
    ExternalDbPersistService, MemoryPersistService, NodePersistence, StorageMode,
};
use rollcall_registry::{HealthSweeper, HttpNodeProbe, NodeProbe, RegistryService};
use rollcall_server::{
    middleware::rate_limit::{self, RateLimiterState},
    model::{AppState, Configuration},
    startup,
};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let configuration = Configuration::new()?;
    let _logging_guard = startup::init_logging(&configuration.logging_config())?;

    let storage_mode = configuration.persistence_mode();
    info!("Persistence mode: {}", storage_mode);

    let store: Arc<dyn NodePersistence> = match storage_mode {
        StorageMode::Sql => {
            let db = configuration.database_connection().await?;
            Migrator::up(&db, None).await?;
            info!("Database migrations applied");
            Arc::new(ExternalDbPersistService::new(db))
        }
        StorageMode::Memory => Arc::new(MemoryPersistService::new()),
    };

    let probe: Arc<dyn NodeProbe> = Arc::new(HttpNodeProbe::new(&configuration.probe_config())?);
    let registry = Arc::new(RegistryService::new(store.clone(), probe.clone()));

    let sweeper = if configuration.sweeper_enabled() {
        let sweeper = HealthSweeper::new(store, probe, configuration.sweeper_config());
        Some(sweeper.start())
    } else {
        info!("Health sweeper disabled");
        None
    };

    // Start background cleanup task for the rate limiter to prevent memory leaks
    let rate_limiter = Arc::new(RateLimiterState::new(configuration.rate_limit_config()));
    let rate_limit_cleanup = rate_limit::start_cleanup_task(rate_limiter.clone());

    let address = configuration.server_address();
    let port = configuration.server_port();
    let app_state = Arc::new(AppState::new(registry));

    info!("Starting Rollcall server on {}:{}", address, port);
    let server = startup::main_server(app_state, rate_limiter, address, port)?;

    // actix handles SIGINT/SIGTERM and resolves once workers have drained
    let result = server.await;
    if let Err(e) = &result {
        error!("HTTP server error: {}", e);
    }

    rate_limit_cleanup.abort();
    if let Some(handle) = sweeper {
        handle.stop().await;
    }
    info!("Rollcall server stopped");

    result?;
    Ok(())
}
