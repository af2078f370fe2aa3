//! services/kitchen/src/bin/kitchen.rs

use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use kitchen_lib::{
    adapters::{FileStore, SystemClock},
    config::Config,
    error::ApiError,
    session::{CookingSessionService, SessionSettings},
    training::TrainingStore,
    web::{self, rest::ApiDoc, state::AppState},
};
use sous_core::heuristics::CookingHeuristics;
use sous_core::ports::{Clock, KeyValueStore};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Store ---
    info!("Opening session store at {}", config.store_path.display());
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.store_path).await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // --- 3. Start the Session Service (restores any resumable session) ---
    let sessions = CookingSessionService::start(
        store.clone(),
        clock.clone(),
        SessionSettings::from(config.as_ref()),
    )
    .await;
    let view = sessions.view();
    if view.is_active {
        info!(
            "Resumed '{}' at step {} of {}.",
            view.recipe_name.as_deref().unwrap_or_default(),
            view.current_step,
            view.total_steps
        );
    }

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        sessions: sessions.clone(),
        training: Arc::new(TrainingStore::new(store, clock)),
        heuristics: Arc::new(CookingHeuristics),
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
        })
        .await?;

    sessions.shutdown().await;
    Ok(())
}
