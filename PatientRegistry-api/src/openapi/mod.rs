use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the `bearer` JWT scheme referenced by protected paths
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::api::handlers::health::root,
        crate::api::handlers::health::health_check,

        // Auth endpoints
        crate::api::handlers::auth::register,
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::refresh,
        crate::api::handlers::auth::me,
        crate::api::handlers::auth::verify,

        // Patient endpoints
        crate::api::handlers::patients::list_patients,
        crate::api::handlers::patients::get_patient,
        crate::api::handlers::patients::create_patient,
        crate::api::handlers::patients::update_patient,
        crate::api::handlers::patients::delete_patient,
        crate::api::handlers::patients::import_patients,
        crate::api::handlers::patients::patient_stats,

        // Search endpoints
        crate::api::handlers::search::search_patients,
        crate::api::handlers::search::suggestions
    ),
    components(
        schemas(
            crate::entities::common::ErrorResponse,

            // Health
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ServiceInfo,
            patient_registry_domain::health::SystemStatus,
            patient_registry_domain::health::ComponentStatus,
            patient_registry_domain::health::HealthComponent,

            // Accounts
            patient_registry_domain::entities::user::RegisterRequest,
            patient_registry_domain::entities::user::LoginRequest,
            patient_registry_domain::entities::user::UserResponse,
            patient_registry_domain::entities::user::TokenPair,
            patient_registry_domain::entities::user::TokenVerification,

            // Patients
            patient_registry_domain::entities::patient::Gender,
            patient_registry_domain::entities::patient::Address,
            patient_registry_domain::entities::patient::EmergencyContact,
            patient_registry_domain::entities::patient::InsuranceInfo,
            patient_registry_domain::entities::patient::CreatePatientRequest,
            patient_registry_domain::entities::patient::UpdatePatientRequest,
            patient_registry_domain::entities::patient::PatientResponse,
            patient_registry_domain::entities::patient::PaginatedPatients,
            patient_registry_domain::entities::patient::ImportSummary,
            patient_registry_domain::entities::patient::PatientStats,

            // Search
            patient_registry_domain::entities::search::SearchResult,
            patient_registry_domain::entities::search::SearchResponse,
            patient_registry_domain::entities::search::SuggestionsResponse
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "health", description = "Service banner and health check"),
        (name = "auth", description = "Accounts and token lifecycle"),
        (name = "patients", description = "Patient records, bulk import and statistics"),
        (name = "search", description = "Patient search and autocomplete")
    ),
    info(
        title = "Patient Registry API",
        version = "1.0.0",
        description = "Gateway for patient registration, authentication and search",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;
