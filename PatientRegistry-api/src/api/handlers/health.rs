use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use patient_registry_domain::health::{HealthComponent, SystemStatus};

use crate::api::routes::AppState;

/// Services multiplexed behind this gateway
pub const SERVICES: [&str; 3] = ["auth-service", "patient-service", "search-service"];

/// Health check response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status ("ok", "degraded", or "error")
    pub status: SystemStatus,
    /// Current application version from Cargo manifest
    pub version: String,
    /// When the response was generated
    pub timestamp: DateTime<Utc>,
    /// Uptime of the service in seconds
    pub uptime: u64,
    pub environment: String,
    /// Component name to component health
    #[schema(value_type = Object)]
    pub components: IndexMap<String, HealthComponent>,
    pub services: Vec<String>,
}

/// Service banner
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub description: String,
    pub version: String,
    pub docs: String,
    pub health: String,
}

/// Service banner with links to the docs and the health check
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "health"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "Patient Registry API Gateway".to_string(),
        description: "Accounts, patient records and patient search".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/docs".to_string(),
        health: "/health".to_string(),
    })
}

/// Health check endpoint aggregating the API and both record stores
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "API is healthy", body = HealthResponse),
        (status = 500, description = "API is not healthy", body = HealthResponse),
        (status = 503, description = "API is degraded", body = HealthResponse)
    ),
    tag = "health"
)]
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    info!("Health check requested");

    let system_health = state.health.get_system_health().await;

    let status_code = match system_health.status {
        SystemStatus::Ok => StatusCode::OK,
        SystemStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
        SystemStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status_code != StatusCode::OK {
        warn!("Health check reports {:?}", system_health.status);
    }

    let response = HealthResponse {
        status: system_health.status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs(),
        environment: state.config.app_env.clone(),
        components: system_health.components,
        services: SERVICES.iter().map(|s| s.to_string()).collect(),
    };

    (status_code, Json(response))
}
