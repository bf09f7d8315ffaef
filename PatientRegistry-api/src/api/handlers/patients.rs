use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::{debug, info, instrument, warn};

use patient_registry_domain::auth::AuthenticatedUser;
use patient_registry_domain::entities::patient::{
    CreatePatientRequest, ImportSummary, PageQuery, PaginatedPatients, PatientResponse, PatientStats,
    UpdatePatientRequest,
};

use crate::api::routes::AppState;
use crate::entities::ErrorResponse;

/// Multipart field carrying the import file
const IMPORT_FIELD: &str = "file";

fn caller(user: Option<Extension<AuthenticatedUser>>) -> Option<String> {
    user.map(|Extension(user)| user.username)
}

/// List patients in creation order
#[utoipa::path(
    get,
    path = "/patients",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of patients", body = PaginatedPatients),
        (status = 400, description = "Invalid paging", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "patients"
)]
#[instrument(skip(state, query))]
pub async fn list_patients(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PaginatedPatients>, ErrorResponse> {
    let Query(page) = query?;
    debug!("Listing patients, page {} of size {}", page.page, page.size);
    Ok(Json(state.patients.list_patients(page).await?))
}

/// Get a single patient by ID
#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(
        ("id" = String, Path, description = "Patient ID")
    ),
    responses(
        (status = 200, description = "Patient found", body = PatientResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "patients"
)]
#[instrument(skip(state))]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PatientResponse>, ErrorResponse> {
    Ok(Json(state.patients.get_patient(&id).await?))
}

/// Register a new patient
#[utoipa::path(
    post,
    path = "/patients",
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient created", body = PatientResponse),
        (status = 400, description = "Invalid data or CPF already registered", body = ErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "patients"
)]
#[instrument(skip(state, user, payload))]
pub async fn create_patient(
    State(state): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
    payload: Result<Json<CreatePatientRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let Json(request) = payload?;
    let patient = state.patients.create_patient(request, caller(user)).await?;
    info!("Patient created with ID: {}", patient.id);
    Ok((StatusCode::CREATED, Json(patient)))
}

/// Partially update a patient
#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(
        ("id" = String, Path, description = "Patient ID")
    ),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = PatientResponse),
        (status = 400, description = "Invalid data or CPF already registered", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "patients"
)]
#[instrument(skip(state, payload))]
pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePatientRequest>, JsonRejection>,
) -> Result<Json<PatientResponse>, ErrorResponse> {
    let Json(request) = payload?;
    Ok(Json(state.patients.update_patient(&id, request).await?))
}

/// Delete a patient
#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(
        ("id" = String, Path, description = "Patient ID")
    ),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 404, description = "Patient not found", body = ErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "patients"
)]
#[instrument(skip(state))]
pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ErrorResponse> {
    state.patients.delete_patient(&id).await?;
    info!("Patient deleted: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Import patients from a JSON file (plain array or FHIR bundle)
#[utoipa::path(
    post,
    path = "/patients/import",
    request_body(content = String, content_type = "multipart/form-data", description = "JSON file in the `file` field"),
    responses(
        (status = 200, description = "Import finished", body = ImportSummary),
        (status = 400, description = "Unsupported or malformed file", body = ErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "patients"
)]
#[instrument(skip(state, user, multipart))]
pub async fn import_patients(
    State(state): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportSummary>, ErrorResponse> {
    let mut multipart = multipart?;
    let created_by = caller(user);

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Unreadable multipart upload: {}", e);
        ErrorResponse::bad_request(e.body_text())
    })? {
        if field.name() != Some(IMPORT_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field
            .bytes()
            .await
            .map_err(|e| ErrorResponse::bad_request(e.body_text()))?;

        let summary = state
            .patients
            .import_patients(&filename, &content, created_by)
            .await?;
        info!(
            "Imported {} patients from {} ({} errors)",
            summary.imported, filename, summary.errors
        );
        return Ok(Json(summary));
    }

    Err(ErrorResponse::validation_error("file: field required", None))
}

/// Aggregate statistics over all patients
#[utoipa::path(
    get,
    path = "/patients/stats/summary",
    responses(
        (status = 200, description = "Patient statistics", body = PatientStats),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "patients"
)]
#[instrument(skip(state))]
pub async fn patient_stats(State(state): State<AppState>) -> Result<Json<PatientStats>, ErrorResponse> {
    Ok(Json(state.patients.stats().await?))
}
