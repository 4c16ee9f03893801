//! REST API over the record store.
//!
//! Routes mirror the resource names used by the property-rental frontend
//! (`/api/UtilityRates`, `/api/UtilityReadings`, ...). Writes require a role
//! given in the `X-User-Role` header; reads are open.

pub mod auth;
pub mod error;
mod handlers;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::store::{Store, StoreError};

/// State shared by all request handlers.
///
/// The store sits behind a single lock; each handler holds it for the whole
/// operation so billing sees a consistent set of rates and readings.
pub struct AppState {
    pub config: AppConfig,
    pub store: RwLock<Store>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store) -> Self {
        Self {
            config,
            store: RwLock::new(store),
        }
    }

    /// Builds state with the store seeded from the configured tariff.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] if a configured rate fails validation.
    pub fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        let store = Store::with_rates(config.tariff.rates.clone())?;
        Ok(Self::new(config, store))
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/UtilityRates",
            get(handlers::list_rates).post(handlers::create_rate),
        )
        .route("/api/UtilityRates/coverage", get(handlers::rate_coverage))
        .route("/api/UtilityRates/quote", post(handlers::quote))
        .route(
            "/api/UtilityRates/{id}",
            get(handlers::get_rate)
                .put(handlers::update_rate)
                .delete(handlers::delete_rate),
        )
        .route(
            "/api/Contracts",
            get(handlers::list_contracts).post(handlers::create_contract),
        )
        .route("/api/Contracts/{id}", get(handlers::get_contract))
        .route(
            "/api/UtilityReadings",
            get(handlers::list_readings).post(handlers::create_reading),
        )
        .route("/api/UtilityReadings/export", get(handlers::export_readings))
        .route(
            "/api/UtilityReadings/{id}",
            get(handlers::get_reading)
                .put(handlers::update_reading)
                .delete(handlers::delete_reading),
        )
        .route("/api/UtilityBills", get(handlers::list_bills))
        .route("/api/UtilityBills/export", get(handlers::export_bills))
        .route(
            "/api/UtilityBills/monthly/{contract_id}",
            post(handlers::generate_monthly_bill),
        )
        .route("/api/UtilityBills/{id}", get(handlers::get_bill))
        .route("/api/Reports/monthly", get(handlers::monthly_report))
        .route("/api/Applicants/rank", post(handlers::rank_applicants))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds to `addr` and serves the API until the process stops.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "API server listening");
    axum::serve(listener, app).await
}
