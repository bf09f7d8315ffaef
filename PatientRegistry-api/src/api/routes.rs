use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use patient_registry_data::repository::{PatientRepository, UserRepository};
use patient_registry_domain::auth::{auth_middleware, configure_security, TokenManager};
use patient_registry_domain::config::AppConfig;
use patient_registry_domain::health::{HealthService, HealthServiceTrait};
use patient_registry_domain::services::{
    create_patient_service, create_search_service, create_user_service, PatientServiceTrait,
    SearchServiceTrait, UserServiceTrait,
};

use crate::api::handlers::{auth, health, patients, search};
use crate::openapi::configure_swagger_routes;

pub type PatientServiceRef = Arc<dyn PatientServiceTrait + Send + Sync>;
pub type SearchServiceRef = Arc<dyn SearchServiceTrait + Send + Sync>;
pub type UserServiceRef = Arc<dyn UserServiceTrait + Send + Sync>;
pub type HealthServiceRef = Arc<dyn HealthServiceTrait>;

/// Services and settings shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub patients: PatientServiceRef,
    pub search: SearchServiceRef,
    pub users: UserServiceRef,
    pub health: HealthServiceRef,
    pub tokens: Arc<TokenManager>,
    pub config: Arc<AppConfig>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the services over fresh in-memory stores
    pub fn new(config: AppConfig) -> Self {
        let patient_store = PatientRepository::new();
        let user_store = UserRepository::new();
        let tokens = Arc::new(TokenManager::new(&config.auth));

        Self {
            patients: Arc::new(create_patient_service(patient_store.clone())),
            search: Arc::new(create_search_service(patient_store.clone())),
            users: Arc::new(create_user_service(
                user_store.clone(),
                tokens.clone(),
                config.auth.bcrypt_cost,
            )),
            health: Arc::new(HealthService::new(patient_store, user_store)),
            tokens,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    /// Replace the health service
    pub fn with_health(mut self, health: HealthServiceRef) -> Self {
        self.health = health;
        self
    }
}

/// Create the application router
pub fn create_app(state: AppState) -> Router {
    debug!("Creating application router");

    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        .route("/auth/verify", post(auth::verify));

    // Static segments before the `:id` route
    let mut record_routes = Router::new()
        .route("/patients", get(patients::list_patients).post(patients::create_patient))
        .route("/patients/import", post(patients::import_patients))
        .route("/patients/stats/summary", get(patients::patient_stats))
        .route(
            "/patients/:id",
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route("/search/patients", get(search::search_patients))
        .route("/search/suggestions", get(search::suggestions));

    if state.config.require_auth {
        record_routes = record_routes.route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            auth_middleware,
        ));
        debug!("Patient and search routes require a bearer token");
    } else {
        info!("REQUIRE_AUTH is off, patient and search routes are public");
    }

    let public_routes = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check));

    let app = Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(record_routes)
        .with_state(state)
        .merge(configure_swagger_routes());

    debug!("Routes and Swagger UI merged");

    configure_security(app).layer(TraceLayer::new_for_http())
}
