use axum::{
    extract::multipart::MultipartRejection,
    extract::rejection::{FormRejection, JsonRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

use patient_registry_domain::services::{AuthServiceError, PatientServiceError, SearchServiceError};

/// Error response format for the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code - machine-readable identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    /// Create a validation error response
    pub fn validation_error(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            details,
            ..Self::new("validation_error", message)
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    /// Uniqueness violation, answered with 400
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("conflict", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    /// Create an internal error response
    pub fn internal_error() -> Self {
        Self::new("internal_error", "An unexpected error occurred")
    }

    /// HTTP status for this error kind
    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "validation_error" | "bad_request" | "conflict" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::UNAUTHORIZED {
            return (
                status,
                [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
                Json(self),
            )
                .into_response();
        }
        (status, Json(self)).into_response()
    }
}

impl From<PatientServiceError> for ErrorResponse {
    fn from(err: PatientServiceError) -> Self {
        match err {
            PatientServiceError::Validation(message) => {
                warn!("Rejected patient data: {}", message);
                ErrorResponse::validation_error(message, None)
            }
            PatientServiceError::NotFound => ErrorResponse::not_found(err.to_string()),
            PatientServiceError::DuplicateCpf => ErrorResponse::conflict(err.to_string()),
            PatientServiceError::Import(import) => ErrorResponse::bad_request(import.to_string()),
            PatientServiceError::Repository(message) => {
                error!("Patient service failure: {}", message);
                ErrorResponse::internal_error()
            }
        }
    }
}

impl From<AuthServiceError> for ErrorResponse {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::Validation(message) => ErrorResponse::validation_error(message, None),
            AuthServiceError::EmailTaken | AuthServiceError::UsernameTaken => {
                ErrorResponse::conflict(err.to_string())
            }
            AuthServiceError::InvalidCredentials
            | AuthServiceError::InvalidToken
            | AuthServiceError::TokenRejected => ErrorResponse::unauthorized(err.to_string()),
            AuthServiceError::InactiveUser => ErrorResponse::bad_request(err.to_string()),
            AuthServiceError::Token(message)
            | AuthServiceError::Password(message)
            | AuthServiceError::Repository(message) => {
                error!("Auth service failure: {}", message);
                ErrorResponse::internal_error()
            }
        }
    }
}

impl From<SearchServiceError> for ErrorResponse {
    fn from(err: SearchServiceError) -> Self {
        error!("Search service failure: {}", err);
        ErrorResponse::internal_error()
    }
}

impl From<JsonRejection> for ErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected JSON body: {}", rejection.body_text());
        ErrorResponse::validation_error(rejection.body_text(), None)
    }
}

impl From<QueryRejection> for ErrorResponse {
    fn from(rejection: QueryRejection) -> Self {
        ErrorResponse::validation_error(rejection.body_text(), None)
    }
}

impl From<FormRejection> for ErrorResponse {
    fn from(rejection: FormRejection) -> Self {
        ErrorResponse::validation_error(rejection.body_text(), None)
    }
}

impl From<MultipartRejection> for ErrorResponse {
    fn from(rejection: MultipartRejection) -> Self {
        ErrorResponse::bad_request(rejection.body_text())
    }
}
