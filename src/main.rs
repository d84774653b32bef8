use std::sync::Arc;

use udfkit::auth::ApiKey;
use udfkit::config::ServerConfig;
use udfkit::executor::dispatch::Dispatcher;
use udfkit::executor::executor::Executor;
use udfkit::executor::registry::RegistryBuilder;
use udfkit::executor::store::{JobStore, spawn_retention_sweeper};
use udfkit::{logging, server, udfs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!(bind = %config.bind, "Loaded server configuration");

    // 1. Registration phase. A duplicate name aborts startup.
    let mut builder = RegistryBuilder::new();
    udfs::register_all(&mut builder)?;
    let registry = builder.build();

    // 2. Job store + retention:
    let jobs = JobStore::new();
    let sweeper = spawn_retention_sweeper(jobs.clone(), config.job_ttl, config.sweep_interval);
    tracing::info!(
        ttl_secs = config.job_ttl.as_secs(),
        interval_secs = config.sweep_interval.as_secs(),
        "Job retention enabled"
    );

    // 3. Worker pool:
    let executor = Executor::start(jobs.clone(), config.executor.clone());

    // 4. HTTP Router:
    let dispatcher = Arc::new(Dispatcher::new(registry, jobs, executor));
    let app = server::build_router(dispatcher, ApiKey::new(&config.api_key));

    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
