//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, GeminiAdapter, LocalStorageAdapter, MokaCacheAdapter},
    config::Config,
    error::ApiError,
    generation::{ContentGenerator, JobOrchestrator, JobQueue, Memoizer, RetryPolicy, RetryingGateway},
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use campus_ai_core::{CacheStore, FileStorage, ResourceRepository};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Jobs that may wait in the queue before `dispatch` applies backpressure.
const JOB_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let resources: Arc<dyn ResourceRepository> = db_adapter;
    let storage: Arc<dyn FileStorage> = Arc::new(LocalStorageAdapter::new(config.storage_root.clone()));
    let cache: Arc<dyn CacheStore> = Arc::new(MokaCacheAdapter::new(config.cache_capacity));
    // Job records get their own store so result churn cannot evict them.
    let job_records: Arc<dyn CacheStore> =
        Arc::new(MokaCacheAdapter::new(config.job_record_capacity));
    let gemini = Arc::new(GeminiAdapter::new(&config.gemini)?);

    // --- 4. Assemble the Generation Pipeline ---
    let gateway = RetryingGateway::new(
        gemini,
        RetryPolicy {
            max_attempts: config.gemini.max_attempts,
            base_delay: config.gemini.backoff_base,
        },
    );
    if !config.single_flight {
        warn!("Single-flight is disabled; concurrent cache misses will each call the model");
    }
    let generator = Arc::new(
        ContentGenerator::new(
            gateway,
            Memoizer::new(cache, config.single_flight),
            config.cache_ttl,
        )
        .with_generation_config(config.gemini.generation),
    );

    let shutdown = CancellationToken::new();
    let orchestrator = Arc::new(JobOrchestrator::new(
        generator.clone(),
        resources.clone(),
        storage.clone(),
        job_records.clone(),
        config.job_ttl,
        config.job_tries,
    ));
    let (jobs, workers) = JobQueue::start(
        orchestrator,
        job_records,
        config.job_ttl,
        config.job_workers,
        JOB_QUEUE_CAPACITY,
        shutdown.clone(),
    );

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        resources,
        storage,
        generator,
        jobs: Arc::new(jobs),
    });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    let api_router = web::router(app_state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            server_shutdown.cancel();
        })
        .await?;

    // Let workers finish the job they are running.
    shutdown.cancel();
    for worker in workers {
        if let Err(e) = worker.await {
            warn!(error = %e, "Job worker ended abnormally");
        }
    }
    info!("Server stopped.");

    Ok(())
}
