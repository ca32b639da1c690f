pub mod config;
pub mod error;
pub mod startup;
pub mod websocket;

use std::sync::Arc;
use actix_web::{web, HttpResponse};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use websocket::{BroadcastRelay, ConnectionRegistry, Event};

/// Health check endpoint handler
/// Returns server status, timestamp and the number of open connections
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let connections = state.registry.connection_count().await;

    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "connections": connections,
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub registry: Arc<ConnectionRegistry>,
    pub relay: Arc<BroadcastRelay>,
}

impl AppState {
    pub fn new(config: Settings) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = Arc::new(BroadcastRelay::new(registry.clone()));

        Self {
            config: Arc::new(config),
            registry,
            relay,
        }
    }
}
