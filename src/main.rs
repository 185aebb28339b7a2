//! GameHub Backend
//!
//! Content store and view backend for the GameHub Telegram mini-app, with
//! SQLite persistence and an external token price source.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod identity;
mod models;
mod notify;
mod price;
mod render;
mod validation;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Storage;
use price::{DexScreenerSource, PriceSource};
use render::admin::AdminRenderer;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub prices: Arc<dyn PriceSource>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn admin(&self) -> AdminRenderer<'_> {
        AdminRenderer::new(&self.storage, self.config.default_usd_to_rub_rate)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting GameHub Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Price source: {} (q={})", config.price_api_url, config.price_query);

    if config.admin_psk.is_none() {
        tracing::warn!("No admin PSK configured (GAMEHUB_ADMIN_PSK). Admin routes are open!");
    }
    if config.bot_token.is_none() {
        tracing::warn!("No bot token configured (GAMEHUB_BOT_TOKEN). Init data is not verified");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let storage = Arc::new(Storage::new(pool));

    let prices = Arc::new(DexScreenerSource::new(
        &config.price_api_url,
        &config.price_query,
        config.price_timeout,
    )?);

    let (_autosave, _) = notify::spawn_autosave_ticker(config.autosave_interval);

    // Create application state
    let state = AppState {
        storage,
        prices,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.admin_psk.clone();

    let admin_routes = Router::new()
        .route("/", get(api::get_admin_view))
        // Announcements
        .route("/announcements", post(api::create_announcement))
        .route("/announcements/{id}", patch(api::update_announcement))
        .route("/announcements/{id}", delete(api::delete_announcement))
        // News
        .route("/news", post(api::create_news))
        .route("/news/{id}", delete(api::delete_news))
        // Games
        .route("/games", post(api::create_game))
        .route("/games/{id}", delete(api::delete_game))
        // Token
        .route("/token", put(api::save_token))
        .route("/token/quote", post(api::fetch_token_quote))
        // Datastore
        .route("/datastore", get(api::get_datastore))
        .route("/revision", get(api::get_revision))
        .route("/import", post(api::import_legacy))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    let catalog_routes = Router::new()
        .route("/", get(api::get_catalog))
        .route("/reviews", get(api::list_reviews))
        .route("/reviews", post(api::submit_review))
        .route("/games/{id}/rating", put(api::rate_game))
        .route("/games/{id}/play", post(api::play_game))
        .route("/announcement/dismiss", post(api::dismiss_announcement))
        .route("/theme", put(api::set_theme));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api/admin", admin_routes)
        .nest("/api/catalog", catalog_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
